use crate::{Account, Note, accounts, notes, reset};
use futures::future::join_all;
use tally::{Driver, Store};

pub async fn increments<D: Driver>(store: &Store<D>) {
    let _lock = notes::MUTEX.lock().await;
    reset::<D, Note>(store).await;

    let key = store
        .insert(
            &Note {
                body: "counter".into(),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("Failed to insert a note");

    // A null column counts as zero
    let likes = store
        .increment::<Note, i64>(key.clone(), "likes", 1, None)
        .await
        .expect("Failed to increment a null column");
    assert_eq!(likes, Some(1));
    let likes = store
        .increment::<Note, i64>(key.clone(), "likes", -3, None)
        .await
        .unwrap();
    assert_eq!(likes, Some(-2));
    assert_eq!(
        store
            .get_field::<Note, i64>("likes", key.clone(), None)
            .await
            .unwrap(),
        Some(-2)
    );

    let missing = store
        .increment::<Note, i64>(987_654i64, "likes", 1, None)
        .await
        .expect("Incrementing a missing row must not fail");
    assert_eq!(missing, None);
}

pub async fn concurrent_increments<D: Driver>(store: &Store<D>) {
    let _lock = accounts::MUTEX.lock().await;
    reset::<D, Account>(store).await;

    store
        .insert(&Account::new(40, "grace", 100), None)
        .await
        .unwrap();
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 40i64, None)
            .await
            .unwrap(),
        Some(100)
    );
    let mut values = join_all(
        (0..3).map(|_| store.increment::<Account, i64>(40i64, "credit", 50, None)),
    )
    .await
    .into_iter()
    .map(|v| v.expect("Failed to increment concurrently").expect("Row vanished"))
    .collect::<Vec<_>>();
    values.sort();
    assert_eq!(values, [150, 200, 250]);

    // Read back through the cache, every increment is visible
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 40i64, None)
            .await
            .unwrap(),
        Some(250)
    );
    assert_eq!(
        store
            .get_by_key::<Account>(40i64, None)
            .await
            .unwrap()
            .map(|v| v.credit),
        Some(250)
    );
}

pub async fn concurrent_counters<D: Driver>(store: &Store<D>) {
    let _lock = notes::MUTEX.lock().await;
    reset::<D, Note>(store).await;

    let key = store
        .insert(
            &Note {
                body: "popular".into(),
                likes: Some(100),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    // Warm both the row and the field entries
    assert_eq!(
        store
            .get_by_key::<Note>(key.clone(), None)
            .await
            .unwrap()
            .and_then(|v| v.likes),
        Some(100)
    );
    assert_eq!(
        store
            .get_field::<Note, i64>("likes", key.clone(), None)
            .await
            .unwrap(),
        Some(100)
    );

    let mut values = join_all(
        (0..3).map(|_| store.increment::<Note, i64>(key.clone(), "likes", 50, None)),
    )
    .await
    .into_iter()
    .map(|v| v.expect("Failed to increment concurrently").expect("Row vanished"))
    .collect::<Vec<_>>();
    values.sort();
    assert_eq!(values, [150, 200, 250]);

    assert_eq!(
        store
            .get_field::<Note, i64>("likes", key.clone(), None)
            .await
            .unwrap(),
        Some(250)
    );
    assert_eq!(
        store
            .get_by_key::<Note>(key.clone(), None)
            .await
            .unwrap()
            .and_then(|v| v.likes),
        Some(250)
    );
}
