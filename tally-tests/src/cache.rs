use crate::{Account, accounts::MUTEX, reset};
use std::sync::LazyLock;
use tally::{Driver, Entity, Store};
use tokio::sync::Mutex;

/// Keyed by a free form handle, which may contain the cache key separator.
#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[tally(name = "players")]
pub struct Player {
    #[tally(key)]
    pub handle: String,
    pub score: i64,
}

static PLAYERS: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

async fn name_of<D: Driver>(store: &Store<D>, id: i64) -> String {
    store
        .get_by_key::<Account>(id, None)
        .await
        .expect("Failed to get the account")
        .expect("The account does not exist")
        .name
}

pub async fn cache_coherence<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    store
        .insert(&Account::new(20, "eve", 5), None)
        .await
        .expect("Failed to insert eve");
    assert_eq!(name_of(store, 20).await, "eve");
    if let Some(stats) = store.cache_stats() {
        let hits = stats.hits();
        assert_eq!(name_of(store, 20).await, "eve");
        assert!(stats.hits() > hits);
    }

    // Raw statements bypass the cache until the entry is dropped
    store
        .execute_raw(
            "UPDATE accounts SET name = {0} WHERE id = {1}",
            &["mallory".into(), 20i64.into()],
            None,
        )
        .await
        .expect("Failed to rename eve");
    assert_eq!(name_of(store, 20).await, "eve");
    store.invalidate::<Account>(20i64);
    assert_eq!(name_of(store, 20).await, "mallory");

    // Writes through the store invalidate
    let mut account = Account::new(20, "oscar", 5);
    store.update(&account, None).await.unwrap();
    assert_eq!(name_of(store, 20).await, "oscar");

    // The cache changes only once the transaction commits
    let mut transaction = store.begin(None).await.expect("Failed to begin");
    account.name = "trudy".into();
    store
        .update(&account, Some(&mut transaction))
        .await
        .expect("Failed to update inside the transaction");
    assert_eq!(name_of(store, 20).await, "oscar");
    let inside = store
        .get_by_key::<Account>(20i64, Some(&mut transaction))
        .await
        .unwrap()
        .expect("The account must be visible inside the transaction");
    assert_eq!(inside.name, "trudy");
    transaction.commit().await.expect("Failed to commit");
    assert_eq!(name_of(store, 20).await, "trudy");

    // A rollback leaves the cache alone
    let mut transaction = store.begin(None).await.unwrap();
    account.name = "zed".into();
    store
        .update(&account, Some(&mut transaction))
        .await
        .unwrap();
    transaction.rollback().await.expect("Failed to roll back");
    assert_eq!(name_of(store, 20).await, "trudy");
    store.clear_cache();
    assert_eq!(name_of(store, 20).await, "trudy");

    // Deleted rows are not served from the cache
    store.delete::<Account>(20i64, None).await.unwrap();
    assert!(
        store
            .get_by_key::<Account>(20i64, None)
            .await
            .unwrap()
            .is_none()
    );
    assert!(!store.exists::<Account>(20i64, None).await.unwrap());
}

pub async fn high_frequency<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Account>(store).await;

    store
        .insert(&Account::new(30, "frank", 10), None)
        .await
        .unwrap();
    let cached = store
        .get_by_key::<Account>(30i64, None)
        .await
        .unwrap()
        .expect("Frank is missing");
    assert_eq!(cached.credit, 10);
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 30i64, None)
            .await
            .unwrap(),
        Some(10)
    );

    // Writing only a high frequency column drops the field entry and keeps the row entry
    let credit = store
        .increment::<Account, i64>(30i64, "credit", 5, None)
        .await
        .expect("Failed to increment the credit");
    assert_eq!(credit, Some(15));
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 30i64, None)
            .await
            .unwrap(),
        Some(15)
    );
    let row = store
        .get_by_key::<Account>(30i64, None)
        .await
        .unwrap()
        .expect("Frank is missing");
    assert_eq!(row.credit, 10, "The row entry is kept for the staleness window");

    // Any other column drops the row entry
    store
        .set_field::<Account>(30i64, "name", "franklin".to_string(), None)
        .await
        .unwrap();
    let row = store
        .get_by_key::<Account>(30i64, None)
        .await
        .unwrap()
        .expect("Frank is missing");
    assert_eq!(row.name, "franklin");
    assert_eq!(row.credit, 15);
    assert_eq!(
        store
            .get_field::<Account, String>("name", 30i64, None)
            .await
            .unwrap()
            .as_deref(),
        Some("franklin")
    );

    let mut account = row.clone();
    account.credit = 1;
    store
        .update_columns(&account, &["credit"], None)
        .await
        .unwrap();
    assert_eq!(
        store
            .get_field::<Account, i64>("credit", 30i64, None)
            .await
            .unwrap(),
        Some(1)
    );
}

pub async fn separator_in_keys<D: Driver>(store: &Store<D>) {
    let _lock = PLAYERS.lock().await;
    reset::<D, Player>(store).await;

    for (handle, score) in [("x", 7), ("score:x", 9), ("a:b", 3)] {
        store
            .insert(
                &Player {
                    handle: handle.into(),
                    score,
                },
                None,
            )
            .await
            .unwrap_or_else(|e| panic!("Failed to insert `{}`: {:#}", handle, e));
    }
    assert_eq!(
        store
            .get_field::<Player, i64>("score", "x".to_string(), None)
            .await
            .unwrap(),
        Some(7)
    );
    let player = store
        .get_by_key::<Player>("score:x".to_string(), None)
        .await
        .expect("Failed to get the player")
        .expect("The player does not exist");
    assert_eq!(player.handle, "score:x");
    assert_eq!(player.score, 9);
    // Served from the cache this time
    assert_eq!(
        store
            .get_by_key::<Player>("score:x".to_string(), None)
            .await
            .unwrap()
            .map(|v| v.score),
        Some(9)
    );
    assert_eq!(
        store
            .get_field::<Player, i64>("score", "x".to_string(), None)
            .await
            .unwrap(),
        Some(7)
    );
    assert_eq!(
        store
            .get_field::<Player, i64>("score", "a:b".to_string(), None)
            .await
            .unwrap(),
        Some(3)
    );
}
