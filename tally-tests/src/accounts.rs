use crate::reset;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tally::{Driver, EngineError, Entity, Filter, Order, Store, WriteOutcome};
use tokio::sync::Mutex;

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[tally(name = "accounts")]
pub struct Account {
    #[tally(key)]
    pub id: i64,
    pub name: String,
    #[tally(high_frequency)]
    pub credit: i64,
    pub nickname: Option<String>,
    pub balance: Decimal,
    pub active: bool,
}

impl Account {
    pub fn new(id: i64, name: &str, credit: i64) -> Self {
        Self {
            id,
            name: name.into(),
            credit,
            nickname: None,
            balance: Decimal::new(1250, 2),
            active: true,
        }
    }
}

pub(crate) static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn accounts<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    let mut alice = Account::new(1, "alice", 100);
    alice.nickname = Some("al".into());
    let key = store
        .insert(&alice, None)
        .await
        .expect("Failed to insert alice");
    assert_eq!(key, 1i64.into());
    store
        .insert(&Account::new(2, "bob", 20), None)
        .await
        .expect("Failed to insert bob");
    store
        .insert(&Account::new(3, "carol", 20), None)
        .await
        .expect("Failed to insert carol");

    let loaded = store
        .get_by_key::<Account>(1i64, None)
        .await
        .expect("Failed to get alice");
    assert_eq!(loaded, Some(alice.clone()));
    assert!(
        store
            .get_by_key::<Account>(99i64, None)
            .await
            .expect("Failed to get a missing account")
            .is_none()
    );
    assert!(store.exists::<Account>(2i64, None).await.unwrap());
    assert!(!store.exists::<Account>(99i64, None).await.unwrap());

    let name = store
        .get_field::<Account, String>("name", 2i64, None)
        .await
        .expect("Failed to read the name of bob");
    assert_eq!(name.as_deref(), Some("bob"));
    let nickname = store
        .get_field::<Account, String>("nickname", 2i64, None)
        .await
        .expect("Failed to read a null nickname");
    assert_eq!(nickname, None);
    let missing = store
        .get_field::<Account, String>("name", 99i64, None)
        .await
        .expect("Failed to read the name of a missing account");
    assert_eq!(missing, None);

    // Update
    alice.name = "alice cooper".into();
    alice.nickname = None;
    alice.balance = Decimal::new(-75, 1);
    let outcome = store
        .update(&alice, None)
        .await
        .expect("Failed to update alice");
    assert_eq!(outcome, WriteOutcome::Affected(1));
    let loaded = store
        .get_by_key::<Account>(1i64, None)
        .await
        .unwrap()
        .expect("Alice disappeared");
    assert_eq!(loaded, alice);
    let outcome = store
        .update(&Account::new(99, "nobody", 0), None)
        .await
        .expect("Updating a missing row must not fail");
    assert_eq!(outcome, WriteOutcome::NotFound);

    // Partial update
    let mut partial = Account::new(2, "robert", 9999);
    partial.active = false;
    let outcome = store
        .update_columns(&partial, &["name", "active"], None)
        .await
        .expect("Failed to update the columns of bob");
    assert!(outcome.is_found());
    let bob = store
        .get_by_key::<Account>(2i64, None)
        .await
        .unwrap()
        .expect("Bob disappeared");
    assert_eq!(bob.name, "robert");
    assert!(!bob.active);
    assert_eq!(bob.credit, 20);
    assert!(
        store
            .update_columns(&partial, &["id"], None)
            .await
            .is_err()
    );

    // Single field
    let outcome = store
        .set_field::<Account>(3i64, "nickname", Some("cc".to_string()), None)
        .await
        .expect("Failed to set the nickname of carol");
    assert_eq!(outcome, WriteOutcome::Affected(1));
    assert_eq!(
        store
            .get_field::<Account, String>("nickname", 3i64, None)
            .await
            .unwrap()
            .as_deref(),
        Some("cc")
    );
    let outcome = store
        .set_field::<Account>(99i64, "nickname", "x".to_string(), None)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::NotFound);

    // Count and select
    assert_eq!(store.count::<Account>(&Filter::new(), None).await.unwrap(), 3);
    assert_eq!(
        store
            .count::<Account>(&Filter::new().eq("credit", 20i64), None)
            .await
            .unwrap(),
        2
    );
    let selected = store
        .select::<Account>(
            &Filter::new()
                .eq("credit", 20i64)
                .order_by("id", Order::Desc)
                .limit(1),
            None,
        )
        .await
        .expect("Failed to select accounts");
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, 3);

    // Upsert
    let mut dave = Account::new(4, "dave", 1);
    assert!(store.upsert(&dave, None).await.unwrap().is_found());
    dave.credit = 2;
    assert!(store.upsert(&dave, None).await.unwrap().is_found());
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 4i64, None)
            .await
            .unwrap(),
        Some(2)
    );
    assert_eq!(store.count::<Account>(&Filter::new(), None).await.unwrap(), 4);

    // Delete
    let outcome = store.delete::<Account>(4i64, None).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Affected(1));
    let outcome = store.delete::<Account>(4i64, None).await.unwrap();
    assert_eq!(outcome, WriteOutcome::NotFound);
    assert!(
        store
            .get_by_key::<Account>(4i64, None)
            .await
            .unwrap()
            .is_none()
    );
}

pub async fn where_safety<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    // Values are always bound, never spliced into the text
    let hostile = "x'); DELETE FROM accounts; --";
    store
        .insert(&Account::new(10, hostile, 0), None)
        .await
        .expect("Failed to insert the hostile name");
    store
        .insert(&Account::new(11, "bystander", 0), None)
        .await
        .unwrap();
    let found = store
        .select::<Account>(&Filter::new().eq("name", hostile), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 10);
    assert_eq!(store.count::<Account>(&Filter::new(), None).await.unwrap(), 2);

    // Columns must belong to the entity
    let error = store
        .select::<Account>(&Filter::new().eq("name; DROP TABLE accounts", 1i64), None)
        .await
        .expect_err("An unknown column must be refused");
    assert!(matches!(
        error.downcast_ref::<EngineError>(),
        Some(EngineError::UnknownColumn { .. })
    ));
    let error = store
        .get_field::<Account, i64>("missing", 10i64, None)
        .await
        .expect_err("An unknown field must be refused");
    assert!(matches!(
        error.downcast_ref::<EngineError>(),
        Some(EngineError::UnknownColumn { .. })
    ));
    assert!(
        store
            .increment::<Account, i64>(10i64, "id", 1, None)
            .await
            .is_err()
    );
    assert_eq!(store.count::<Account>(&Filter::new(), None).await.unwrap(), 2);
}
