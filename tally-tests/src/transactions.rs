use crate::{Account, accounts::MUTEX, reset};
use tally::{Driver, EngineError, Error, Store, TransactionState, WriteOutcome};

pub async fn idempotent_commit<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    let mut transaction = store
        .begin(None)
        .await
        .expect("Could not begin a transaction");
    assert!(transaction.is_owner());
    store
        .insert(&Account::new(50, "heidi", 1), Some(&mut transaction))
        .await
        .expect("Failed to insert inside the transaction");
    transaction.commit().await.expect("Failed to commit");
    assert_eq!(transaction.state(), TransactionState::Committed);
    transaction
        .commit()
        .await
        .expect("A second commit is a no-op");
    transaction
        .rollback()
        .await
        .expect("A rollback after commit is a no-op");
    assert_eq!(transaction.state(), TransactionState::Committed);

    let error = store
        .insert(&Account::new(51, "ivan", 1), Some(&mut transaction))
        .await
        .expect_err("A finalized transaction cannot run statements");
    assert!(matches!(
        error.downcast_ref::<EngineError>(),
        Some(EngineError::TransactionFinalized(TransactionState::Committed))
    ));
    drop(transaction);
    assert!(store.exists::<Account>(50i64, None).await.unwrap());
    assert!(!store.exists::<Account>(51i64, None).await.unwrap());
}

pub async fn rollback<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    let mut transaction = store.begin(None).await.unwrap();
    store
        .insert(&Account::new(60, "judy", 1), Some(&mut transaction))
        .await
        .unwrap();
    assert!(
        store
            .exists::<Account>(60i64, Some(&mut transaction))
            .await
            .unwrap()
    );
    transaction.rollback().await.expect("Failed to roll back");
    transaction
        .rollback()
        .await
        .expect("A second rollback is a no-op");
    transaction
        .commit()
        .await
        .expect("A commit after rollback is a no-op");
    assert_eq!(transaction.state(), TransactionState::RolledBack);
    drop(transaction);
    assert!(!store.exists::<Account>(60i64, None).await.unwrap());
}

pub async fn rollback_on_drop<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    {
        let mut transaction = store.begin(None).await.unwrap();
        store
            .insert(&Account::new(70, "ken", 1), Some(&mut transaction))
            .await
            .unwrap();
    }
    assert!(!store.exists::<Account>(70i64, None).await.unwrap());
    // Waits for the rollback of the dropped transaction to release the row
    store
        .insert(&Account::new(70, "ken", 2), None)
        .await
        .expect("The dropped transaction was not rolled back");
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 70i64, None)
            .await
            .unwrap(),
        Some(2)
    );
}

pub async fn run_in_transaction<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    // Committed when the action succeeds
    let credit = store
        .run_in_transaction(None, async |transaction| {
            store
                .insert(&Account::new(80, "leo", 10), Some(&mut *transaction))
                .await?;
            store
                .increment::<Account, i64>(80i64, "credit", 5, Some(transaction))
                .await
        })
        .await
        .expect("The transaction failed");
    assert_eq!(credit, Some(15));
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 80i64, None)
            .await
            .unwrap(),
        Some(15)
    );

    // Rolled back when it fails
    let error = store
        .run_in_transaction(None, async |transaction| {
            store
                .insert(&Account::new(81, "mia", 1), Some(transaction))
                .await?;
            Err::<(), _>(Error::msg("insufficient credit"))
        })
        .await
        .expect_err("The action error must be returned");
    assert_eq!(error.to_string(), "insufficient credit");
    assert!(!store.exists::<Account>(81i64, None).await.unwrap());

    // Joining a transaction leaves the outcome to its owner
    let mut outer = store.begin(None).await.unwrap();
    store
        .run_in_transaction(Some(&mut outer), async |transaction| {
            assert!(!transaction.is_owner());
            store
                .insert(&Account::new(82, "nina", 1), Some(transaction))
                .await
        })
        .await
        .expect("The joined action failed");
    assert!(outer.is_open());
    assert!(
        store
            .exists::<Account>(82i64, Some(&mut outer))
            .await
            .unwrap()
    );
    outer.rollback().await.unwrap();
    assert!(!store.exists::<Account>(82i64, None).await.unwrap());
}

pub async fn select_for_update<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    store
        .insert(&Account::new(90, "olga", 10), None)
        .await
        .unwrap();
    // Warm the cache, the locked read and the write below must not be shadowed by it
    store.get_by_key::<Account>(90i64, None).await.unwrap();

    let mut transaction = store.begin(None).await.unwrap();
    let mut account = store
        .select_for_update::<Account>(90i64, &mut transaction)
        .await
        .expect("Failed to lock the row")
        .expect("The row exists");
    assert_eq!(account.credit, 10);
    account.credit += 5;
    assert_eq!(
        store
            .update(&account, Some(&mut transaction))
            .await
            .unwrap(),
        WriteOutcome::Affected(1)
    );
    assert!(
        store
            .select_for_update::<Account>(91i64, &mut transaction)
            .await
            .unwrap()
            .is_none()
    );
    transaction.commit().await.unwrap();

    let account = store
        .get_by_key::<Account>(90i64, None)
        .await
        .unwrap()
        .expect("The row exists");
    assert_eq!(account.credit, 15);
}
