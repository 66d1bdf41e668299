use crate::reset;
use std::sync::LazyLock;
use tally::{Driver, Entity, EntityKey, Store, Value};
use time::{PrimitiveDateTime, macros::datetime};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[tally(name = "notes")]
pub struct Note {
    #[tally(key, generated)]
    pub id: i64,
    pub body: String,
    pub likes: Option<i64>,
    #[tally(skip)]
    pub draft: bool,
}

/// Login session, `last_seen` is written too often to be worth caching.
#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[tally(name = "sessions")]
pub struct Session {
    #[tally(key)]
    pub token: Uuid,
    pub account: i64,
    #[tally(uncached)]
    pub last_seen: Option<PrimitiveDateTime>,
}

pub(crate) static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn generated_keys<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Note>(store).await;

    let note = Note {
        body: "first".into(),
        draft: true,
        ..Default::default()
    };
    let first = store
        .insert(&note, None)
        .await
        .expect("Failed to insert a note with a generated key");
    let second = store
        .insert(
            &Note {
                body: "second".into(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let (EntityKey::Single(Value::Int64(Some(a))), EntityKey::Single(Value::Int64(Some(b)))) =
        (&first, &second)
    else {
        panic!("Unexpected generated keys {:?} and {:?}", first, second);
    };
    assert!(*a > 0);
    assert_ne!(a, b);

    let loaded = store
        .get_by_key::<Note>(first.clone(), None)
        .await
        .unwrap()
        .expect("The first note is missing");
    assert_eq!(loaded.id, *a);
    assert_eq!(loaded.body, "first");
    assert_eq!(loaded.likes, None);
    assert!(!loaded.draft, "Skipped fields are never stored");

    // An explicit key is kept
    let explicit = store
        .insert(
            &Note {
                id: 1000,
                body: "explicit".into(),
                likes: Some(4),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(explicit, 1000i64.into());
    assert_eq!(
        store
            .get_field::<Note, i64>("likes", 1000i64, None)
            .await
            .unwrap(),
        Some(4)
    );
}

pub async fn uncached<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Session>(store).await;

    let token = Uuid::new_v4();
    store
        .insert(
            &Session {
                token,
                account: 1,
                last_seen: None,
            },
            None,
        )
        .await
        .expect("Failed to insert a session");
    let session = store
        .get_by_key::<Session>(token, None)
        .await
        .unwrap()
        .expect("The session is missing");
    assert_eq!(session.account, 1);
    assert_eq!(
        store
            .get_field::<Session, i64>("account", token, None)
            .await
            .unwrap(),
        Some(1)
    );

    store
        .execute_raw(
            "UPDATE sessions SET account = {0} WHERE token = {1}",
            &[2i64.into(), token.into()],
            None,
        )
        .await
        .unwrap();
    // Rows holding an uncached column always come from the database
    let session = store
        .get_by_key::<Session>(token, None)
        .await
        .unwrap()
        .expect("The session is missing");
    assert_eq!(session.account, 2);
    // Cached columns are still served from their field entry
    assert_eq!(
        store
            .get_field::<Session, i64>("account", token, None)
            .await
            .unwrap(),
        Some(1)
    );

    let seen = datetime!(2024-05-01 10:30:00);
    store
        .set_field::<Session>(token, "last_seen", Some(seen), None)
        .await
        .expect("Failed to set last_seen");
    assert_eq!(
        store
            .get_field::<Session, PrimitiveDateTime>("last_seen", token, None)
            .await
            .unwrap(),
        Some(seen)
    );
    store
        .execute_raw(
            "UPDATE sessions SET last_seen = NULL WHERE token = {0}",
            &[token.into()],
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        store
            .get_field::<Session, PrimitiveDateTime>("last_seen", token, None)
            .await
            .unwrap(),
        None
    );
}
