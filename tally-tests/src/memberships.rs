use crate::reset;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tally::{
    Discriminant, Driver, Entity, EntityKey, Filter, Json, MappingMode, Store, WriteOutcome,
};
use time::{Date, macros::date};
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[default]
    Member = 1,
    Moderator = 2,
    Owner = 3,
}

impl From<Role> for i64 {
    fn from(value: Role) -> Self {
        value as i64
    }
}

impl TryFrom<i64> for Role {
    type Error = i64;
    fn try_from(value: i64) -> Result<Self, i64> {
        match value {
            1 => Ok(Role::Member),
            2 => Ok(Role::Moderator),
            3 => Ok(Role::Owner),
            v => Err(v),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub notifications: bool,
    pub tags: Vec<String>,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[tally(name = "memberships")]
pub struct Membership {
    #[tally(key)]
    pub user_id: i64,
    #[tally(key2)]
    pub guild: String,
    #[tally(converter = Discriminant)]
    pub role: Role,
    #[tally(converter = Json, sql_type = "TEXT")]
    pub settings: Settings,
    #[tally(name = "joined_on")]
    pub joined: Option<Date>,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn key(user_id: i64, guild: &str) -> EntityKey {
    EntityKey::composite(user_id, guild.to_string())
}

pub async fn memberships<D: Driver>(store: &Store<D>) {
    let _lock = MUTEX.lock().await;
    reset::<D, Membership>(store).await;

    let rust = Membership {
        user_id: 7,
        guild: "rust".into(),
        role: Role::Owner,
        settings: Settings {
            notifications: true,
            tags: vec!["systems".into(), "async".into()],
        },
        joined: Some(date!(2024 - 03 - 01)),
    };
    let go = Membership {
        user_id: 7,
        guild: "go".into(),
        ..Default::default()
    };
    let inserted = store
        .insert(&rust, None)
        .await
        .expect("Failed to insert a membership");
    assert_eq!(inserted, key(7, "rust"));
    store.insert(&go, None).await.unwrap();

    let loaded = store
        .get_by_key::<Membership>(key(7, "rust"), None)
        .await
        .expect("Failed to get a membership")
        .expect("The membership is missing");
    assert_eq!(loaded, rust);
    let loaded = store
        .get_by_key::<Membership>(key(7, "go"), None)
        .await
        .unwrap()
        .expect("The membership is missing");
    assert_eq!(loaded, go);
    assert!(
        store
            .get_by_key::<Membership>(7i64, None)
            .await
            .is_err(),
        "A composite key needs both parts"
    );
    assert_eq!(
        store
            .count::<Membership>(&Filter::new().eq("user_id", 7i64), None)
            .await
            .unwrap(),
        2
    );

    // Converted fields
    let role = store
        .get_field::<Membership, i64>("role", key(7, "rust"), None)
        .await
        .unwrap();
    assert_eq!(role, Some(3));
    let mut promoted = go.clone();
    promoted.role = Role::Moderator;
    promoted.settings.tags.push("gophers".into());
    assert_eq!(
        store.update(&promoted, None).await.unwrap(),
        WriteOutcome::Affected(1)
    );
    let loaded = store
        .get_by_key::<Membership>(key(7, "go"), None)
        .await
        .unwrap()
        .expect("The membership is missing");
    assert_eq!(loaded, promoted);

    // An unknown discriminant is tolerated by lenient mapping only
    store
        .execute_raw(
            "UPDATE memberships SET role = {0} WHERE user_id = {1} AND guild = {2}",
            &[9i64.into(), 7i64.into(), "go".into()],
            None,
        )
        .await
        .unwrap();
    store.invalidate::<Membership>(key(7, "go"));
    let loaded = store
        .get_by_key::<Membership>(key(7, "go"), None)
        .await
        .unwrap()
        .expect("The membership is missing");
    assert_eq!(loaded.role, Role::Member);
    assert_eq!(loaded.settings, promoted.settings);
    let rows = store
        .query_raw(
            "SELECT * FROM memberships WHERE user_id = {0} AND guild = {1}",
            &[7i64.into(), "go".into()],
            None,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(Membership::from_row_with(&rows[0], MappingMode::Strict).is_err());
    assert!(Membership::from_row_with(&rows[0], MappingMode::Lenient).is_ok());

    // Deleting one membership keeps the other
    assert!(
        store
            .delete::<Membership>(key(7, "go"), None)
            .await
            .unwrap()
            .is_found()
    );
    assert!(
        store
            .exists::<Membership>(key(7, "rust"), None)
            .await
            .unwrap()
    );
    assert!(
        !store
            .exists::<Membership>(key(7, "go"), None)
            .await
            .unwrap()
    );
}
