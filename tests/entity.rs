#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use tally::{
        ColumnDef, Discriminant, Entity, EntityKey, Json, KeyDescriptor, KeyPart, MappingMode,
        RowLabeled, Value,
    };

    #[derive(Default, Debug, Clone, Copy, PartialEq)]
    enum Tier {
        #[default]
        Free,
        Paid,
    }

    impl From<Tier> for i64 {
        fn from(value: Tier) -> Self {
            match value {
                Tier::Free => 0,
                Tier::Paid => 1,
            }
        }
    }

    impl TryFrom<i64> for Tier {
        type Error = i64;
        fn try_from(value: i64) -> Result<Self, Self::Error> {
            match value {
                0 => Ok(Tier::Free),
                1 => Ok(Tier::Paid),
                v => Err(v),
            }
        }
    }

    #[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Preferences {
        theme: String,
    }

    #[derive(Entity, Default, Debug, Clone, PartialEq)]
    #[tally(name = "wallets")]
    struct Wallet {
        #[tally(key, generated)]
        id: i64,
        owner: String,
        #[tally(high_frequency)]
        credit: i64,
        #[tally(name = "display_name")]
        display: Option<String>,
        #[tally(converter = Discriminant)]
        tier: Tier,
        #[tally(converter = Json, sql_type = "TEXT")]
        preferences: Preferences,
        #[tally(uncached)]
        flagged: bool,
        #[tally(skip)]
        scratch: u32,
    }

    #[derive(Entity, Default, Debug, PartialEq)]
    struct GuildMember {
        #[tally(key)]
        user: i64,
        #[tally(key2)]
        guild: String,
        rank: i32,
    }

    fn row(names: &[&str], values: Vec<Value>) -> RowLabeled {
        RowLabeled::new(
            Arc::from(names.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
            values.into_boxed_slice(),
        )
    }

    #[test]
    fn descriptor() {
        let descriptor = Wallet::descriptor();
        assert_eq!(Wallet::table(), "wallets");
        assert_eq!(
            descriptor.column_names(),
            [
                "id",
                "owner",
                "credit",
                "display_name",
                "tier",
                "preferences",
                "flagged"
            ]
        );
        assert_eq!(descriptor.key, KeyDescriptor::Single(0));
        let columns = &descriptor.columns;
        assert_eq!(columns[0].key, KeyPart::Key);
        assert!(columns[0].generated);
        assert!(!columns[0].nullable);
        assert!(columns[2].high_frequency);
        assert!(columns[3].nullable);
        assert!(matches!(columns[3].value, Value::Varchar(None)));
        assert!(matches!(columns[4].value, Value::Int64(None)));
        assert_eq!(columns[5].sql_type, Some("TEXT"));
        assert!(columns[6].uncached);
        assert!(descriptor.has_high_frequency());
        assert!(std::ptr::eq(descriptor, Wallet::descriptor()));

        let member = GuildMember::descriptor();
        assert_eq!(member.table, "guild_member");
        assert_eq!(member.key, KeyDescriptor::Composite(0, 1));
        assert_eq!(member.key_names(), ["user", "guild"]);
        assert!(!member.has_high_frequency());
    }

    #[test]
    fn hand_written_descriptor_requires_a_key() {
        assert!(
            tally::EntityDescriptor::new(
                "keyless",
                vec![ColumnDef::new("value", Value::Int64(None))]
            )
            .is_err()
        );
    }

    #[test]
    fn extract_fields() {
        let wallet = Wallet {
            id: 3,
            owner: "ada".into(),
            credit: 40,
            display: None,
            tier: Tier::Paid,
            preferences: Preferences {
                theme: "dark".into(),
            },
            flagged: true,
            scratch: 99,
        };
        let fields = wallet.extract_fields().unwrap();
        assert_eq!(
            fields,
            [
                ("id", Value::Int64(Some(3))),
                ("owner", Value::Varchar(Some("ada".into()))),
                ("credit", Value::Int64(Some(40))),
                ("display_name", Value::Varchar(None)),
                ("tier", Value::Int64(Some(1))),
                ("preferences", Value::Varchar(Some(r#"{"theme":"dark"}"#.into()))),
                ("flagged", Value::Boolean(Some(true))),
            ]
        );
        assert_eq!(wallet.primary_key(), EntityKey::single(3i64));
        let member = GuildMember {
            user: 1,
            guild: "rust".into(),
            rank: 2,
        };
        assert_eq!(
            member.primary_key(),
            EntityKey::composite(1i64, "rust".to_string())
        );
        assert_eq!(member.primary_key().to_string(), "1:rust");
    }

    #[test]
    fn from_row() {
        let wallet = Wallet::from_row(&row(
            &["id", "owner", "credit", "display_name", "tier", "preferences", "flagged"],
            vec![
                Value::Int64(Some(3)),
                Value::Varchar(Some("ada".into())),
                Value::Int64(Some(40)),
                Value::Varchar(Some("Ada".into())),
                Value::Int64(Some(1)),
                Value::Varchar(Some(r#"{"theme":"light"}"#.into())),
                Value::Int64(Some(0)),
            ],
        ))
        .unwrap();
        assert_eq!(
            wallet,
            Wallet {
                id: 3,
                owner: "ada".into(),
                credit: 40,
                display: Some("Ada".into()),
                tier: Tier::Paid,
                preferences: Preferences {
                    theme: "light".into(),
                },
                flagged: false,
                scratch: 0,
            }
        );
    }

    #[test]
    fn from_partial_row() {
        let wallet = Wallet::from_row(&row(
            &["credit", "unrelated"],
            vec![Value::Varchar(Some("12".into())), Value::Int64(Some(5))],
        ))
        .unwrap();
        assert_eq!(wallet.credit, 12);
        assert_eq!(wallet.id, 0);
        assert_eq!(wallet.owner, "");
        assert_eq!(wallet.display, None);
    }

    #[test]
    fn lenient_and_strict_mapping() {
        let bad = row(
            &["id", "credit", "tier"],
            vec![
                Value::Int64(Some(3)),
                Value::Varchar(Some("plenty".into())),
                Value::Int64(Some(7)),
            ],
        );
        let wallet = Wallet::from_row(&bad).unwrap();
        assert_eq!(wallet.id, 3);
        assert_eq!(wallet.credit, 0);
        assert_eq!(wallet.tier, Tier::Free);
        let error = Wallet::from_row_with(&bad, MappingMode::Strict).unwrap_err();
        assert!(format!("{:#}", error).contains("credit"));

        let null_key = row(&["user", "guild"], vec![Value::Null, Value::Varchar(None)]);
        let member = GuildMember::from_row_with(&null_key, MappingMode::Strict).unwrap();
        assert_eq!(member, GuildMember::default());
    }
}
