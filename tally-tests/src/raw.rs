use crate::{Account, accounts::MUTEX, reset};
use tally::{AsValue, Driver, EngineError, Store};

pub async fn raw_templates<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    for (id, name, credit) in [(1, "ann", 10), (2, "ben", 20), (3, "cid", 30)] {
        store
            .insert(&Account::new(id, name, credit), None)
            .await
            .expect("Failed to insert an account");
    }

    // The same argument can appear more than once
    let rows = store
        .query_raw(
            "SELECT name FROM accounts WHERE credit >= {0} OR id = {0} ORDER BY id",
            &[20i64.into()],
            None,
        )
        .await
        .expect("Failed to run the raw query");
    let names = rows
        .iter()
        .map(|row| {
            String::try_from_value(row.get_column("name").cloned().unwrap_or_default())
                .expect("Name is not text")
        })
        .collect::<Vec<_>>();
    assert_eq!(names, ["ben", "cid"]);

    // Braces inside literals and escaped braces are not placeholders
    let rows = store
        .query_raw("SELECT '{0}' AS literal, '{{x}}' AS other", &[], None)
        .await
        .expect("Failed to run the literal query");
    assert_eq!(
        rows[0].get_column("literal").cloned(),
        Some("{0}".into())
    );

    let accounts = store
        .query_as::<Account>(
            "SELECT * FROM accounts WHERE name = {1} AND credit = {0}",
            &[30i64.into(), "cid".into()],
            None,
        )
        .await
        .unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, 3);

    let error = store
        .query_raw("SELECT * FROM accounts WHERE id = {1}", &[1i64.into()], None)
        .await
        .expect_err("A missing argument must be refused");
    assert!(matches!(
        error.downcast_ref::<EngineError>(),
        Some(EngineError::MissingParameter {
            index: 1,
            provided: 1
        })
    ));

    let outcome = store
        .execute_raw(
            "UPDATE accounts SET credit = credit + {0} WHERE credit < {1}",
            &[1i64.into(), 25i64.into()],
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.rows(), 2);
    let outcome = store
        .execute_raw("DELETE FROM accounts WHERE id = {0}", &[404i64.into()], None)
        .await
        .unwrap();
    assert!(!outcome.is_found());
}
