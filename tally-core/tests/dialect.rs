#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tally_core::{
        ColumnDef, Context, DateUnit, Dialect, EntityDescriptor, Filter, IsolationLevel, Order,
        Value,
        build_create_table, build_increment, build_insert, build_select, build_upsert,
    };

    fn accounts() -> EntityDescriptor {
        EntityDescriptor::new(
            "accounts",
            vec![
                ColumnDef::new("id", Value::Int64(None)).key().generated(),
                ColumnDef::new("name", Value::Varchar(None)),
                ColumnDef::new("credit", Value::Int64(None)).high_frequency(),
                ColumnDef::new("nickname", Value::Varchar(None)).nullable(),
            ],
        )
        .expect("The descriptor has a key")
    }

    fn row() -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Int64(Some(1))),
            ("name", Value::Varchar(Some("Ada".into()))),
        ]
    }

    #[test]
    fn upsert() {
        let upsert = |dialect: Dialect| {
            build_upsert(dialect.writer(), "accounts", &row(), &["id"]).unwrap()
        };
        let postgres = upsert(Dialect::Postgres);
        assert_eq!(
            postgres.sql,
            r#"INSERT INTO "accounts" ("id", "name") VALUES ($1, $2) ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name""#
        );
        assert_eq!(
            postgres.params,
            [Value::Int64(Some(1)), Value::Varchar(Some("Ada".into()))]
        );
        assert_eq!(
            upsert(Dialect::Sqlite).sql,
            r#"INSERT INTO "accounts" ("id", "name") VALUES (?1, ?2) ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name""#
        );
        assert_eq!(
            upsert(Dialect::MySql).sql,
            "INSERT INTO `accounts` (`id`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
        );
        let merge = upsert(Dialect::SqlServer);
        assert_eq!(
            merge.sql,
            indoc! {"
                MERGE INTO [accounts] WITH (HOLDLOCK) AS target
                USING (SELECT @p0 AS [id], @p1 AS [name]) AS source
                ON target.[id] = source.[id]
                WHEN MATCHED THEN UPDATE SET target.[name] = source.[name]
                WHEN NOT MATCHED THEN INSERT ([id], [name]) VALUES (source.[id], source.[name]);"}
        );
        assert_eq!(merge.params.len(), 2);
    }

    #[test]
    fn upsert_of_keys_only() {
        let values = [("id", Value::Int64(Some(1)))];
        assert_eq!(
            build_upsert(Dialect::Postgres.writer(), "accounts", &values, &["id"])
                .unwrap()
                .sql,
            r#"INSERT INTO "accounts" ("id") VALUES ($1) ON CONFLICT ("id") DO NOTHING"#
        );
        assert_eq!(
            build_upsert(Dialect::MySql.writer(), "accounts", &values, &["id"])
                .unwrap()
                .sql,
            "INSERT INTO `accounts` (`id`) VALUES (?) ON DUPLICATE KEY UPDATE `id` = `id`"
        );
        assert_eq!(
            build_upsert(Dialect::SqlServer.writer(), "accounts", &values, &["id"])
                .unwrap()
                .sql,
            indoc! {"
                MERGE INTO [accounts] WITH (HOLDLOCK) AS target
                USING (SELECT @p0 AS [id]) AS source
                ON target.[id] = source.[id]
                WHEN NOT MATCHED THEN INSERT ([id]) VALUES (source.[id]);"}
        );
        assert!(build_upsert(Dialect::Postgres.writer(), "accounts", &values, &[]).is_err());
    }

    #[test]
    fn create_table() {
        let descriptor = accounts();
        let create = |dialect: Dialect| build_create_table(dialect.writer(), &descriptor).sql;
        assert_eq!(
            create(Dialect::Postgres),
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "accounts" (
                "id" BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL,
                "name" TEXT NOT NULL,
                "credit" BIGINT NOT NULL,
                "nickname" TEXT,
                PRIMARY KEY ("id")
                )"#}
        );
        assert_eq!(
            create(Dialect::Sqlite),
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "accounts" (
                "id" INTEGER NOT NULL,
                "name" TEXT NOT NULL,
                "credit" INTEGER NOT NULL,
                "nickname" TEXT,
                PRIMARY KEY ("id")
                )"#}
        );
        assert_eq!(
            create(Dialect::MySql),
            indoc! {"
                CREATE TABLE IF NOT EXISTS `accounts` (
                `id` BIGINT AUTO_INCREMENT NOT NULL,
                `name` TEXT NOT NULL,
                `credit` BIGINT NOT NULL,
                `nickname` TEXT,
                PRIMARY KEY (`id`)
                )"}
        );
        assert_eq!(
            create(Dialect::SqlServer),
            indoc! {"
                IF OBJECT_ID(N'accounts', N'U') IS NULL
                CREATE TABLE [accounts] (
                [id] BIGINT IDENTITY(1,1) NOT NULL,
                [name] NVARCHAR(MAX) NOT NULL,
                [credit] BIGINT NOT NULL,
                [nickname] NVARCHAR(MAX),
                PRIMARY KEY ([id])
                )"}
        );
    }

    #[test]
    fn increment() {
        let keys = [("id", Value::Int64(Some(7)))];
        let increment = |dialect: Dialect| {
            build_increment(
                dialect.writer(),
                "accounts",
                "credit",
                Value::Int64(Some(5)),
                &keys,
            )
            .unwrap()
        };
        let postgres = increment(Dialect::Postgres);
        assert_eq!(
            postgres.sql,
            r#"UPDATE "accounts" SET "credit" = COALESCE("credit", 0) + $1 WHERE "id" = $2 RETURNING "credit""#
        );
        assert_eq!(
            postgres.params,
            [Value::Int64(Some(5)), Value::Int64(Some(7))]
        );
        assert_eq!(
            increment(Dialect::Sqlite).sql,
            r#"UPDATE "accounts" SET "credit" = COALESCE("credit", 0) + ?1 WHERE "id" = ?2 RETURNING "credit""#
        );
        assert_eq!(
            increment(Dialect::MySql).sql,
            "UPDATE `accounts` SET `credit` = COALESCE(`credit`, 0) + ? WHERE `id` = ?"
        );
        assert_eq!(
            increment(Dialect::SqlServer).sql,
            "UPDATE [accounts] SET [credit] = COALESCE([credit], 0) + @p0 OUTPUT INSERTED.[credit] WHERE [id] = @p1"
        );
        let keyless: [(&str, Value); 0] = [];
        assert!(
            build_increment(
                Dialect::Postgres.writer(),
                "accounts",
                "credit",
                Value::Int64(Some(1)),
                &keyless,
            )
            .is_err()
        );
    }

    #[test]
    fn insert_returning_generated_key() {
        let values = [
            ("id", Value::Int64(Some(0))),
            ("name", Value::Varchar(Some("Ada".into()))),
        ];
        let insert = |dialect: Dialect, output: &[&str]| {
            build_insert(dialect.writer(), "accounts", &values, output, &["id"]).sql
        };
        assert_eq!(
            insert(Dialect::Postgres, &["id"]),
            r#"INSERT INTO "accounts" ("name") VALUES ($1) RETURNING "id""#
        );
        assert_eq!(
            insert(Dialect::SqlServer, &["id"]),
            "INSERT INTO [accounts] ([name]) OUTPUT INSERTED.[id] VALUES (@p0)"
        );
        assert_eq!(
            insert(Dialect::MySql, &[]),
            "INSERT INTO `accounts` (`name`) VALUES (?)"
        );
        let only_key = [("id", Value::Int64(Some(0)))];
        let empty = |dialect: Dialect, output: &[&str]| {
            build_insert(dialect.writer(), "notes", &only_key, output, &["id"]).sql
        };
        assert_eq!(
            empty(Dialect::Postgres, &["id"]),
            r#"INSERT INTO "notes" DEFAULT VALUES RETURNING "id""#
        );
        assert_eq!(
            empty(Dialect::SqlServer, &["id"]),
            "INSERT INTO [notes] OUTPUT INSERTED.[id] DEFAULT VALUES"
        );
        assert_eq!(empty(Dialect::MySql, &[]), "INSERT INTO `notes` () VALUES ()");
    }

    #[test]
    fn select_for_update() {
        let filter = Filter::new().eq("id", 1i64).eq("guild", 2i64);
        let lock = |dialect: Dialect| {
            build_select(dialect.writer(), "accounts", &["id", "credit"], &filter, true)
                .unwrap()
                .sql
        };
        assert_eq!(
            lock(Dialect::Postgres),
            r#"SELECT "id", "credit" FROM "accounts" WHERE "id" = $1 AND "guild" = $2 FOR UPDATE"#
        );
        assert_eq!(
            lock(Dialect::MySql),
            "SELECT `id`, `credit` FROM `accounts` WHERE `id` = ? AND `guild` = ? FOR UPDATE"
        );
        assert_eq!(
            lock(Dialect::SqlServer),
            "SELECT [id], [credit] FROM [accounts] WITH (UPDLOCK, ROWLOCK) WHERE [id] = @p0 AND [guild] = @p1"
        );
        assert_eq!(
            lock(Dialect::Sqlite),
            r#"SELECT "id", "credit" FROM "accounts" WHERE "id" = ?1 AND "guild" = ?2"#
        );
    }

    #[test]
    fn offset_without_limit() {
        let filter = Filter::new().offset(5);
        let select = |dialect: Dialect| {
            build_select(dialect.writer(), "accounts", &["id"], &filter, false)
                .unwrap()
                .sql
        };
        assert_eq!(
            select(Dialect::Postgres),
            r#"SELECT "id" FROM "accounts" OFFSET 5"#
        );
        assert_eq!(
            select(Dialect::Sqlite),
            r#"SELECT "id" FROM "accounts" LIMIT -1 OFFSET 5"#
        );
        assert_eq!(
            select(Dialect::MySql),
            format!("SELECT `id` FROM `accounts` LIMIT {} OFFSET 5", u64::MAX)
        );
        assert_eq!(
            select(Dialect::SqlServer),
            "SELECT [id] FROM [accounts] ORDER BY (SELECT NULL) OFFSET 5 ROWS"
        );
        let ordered = build_select(
            Dialect::SqlServer.writer(),
            "accounts",
            &["id"],
            &Filter::new().order_by("id", Order::Asc).offset(5).limit(2),
            false,
        )
        .unwrap();
        assert_eq!(
            ordered.sql,
            "SELECT [id] FROM [accounts] ORDER BY [id] OFFSET 5 ROWS FETCH NEXT 2 ROWS ONLY"
        );
    }

    #[test]
    fn null_condition_is_not_bound() {
        let filter = Filter::new()
            .eq("nickname", Value::Varchar(None))
            .eq("credit", 3i64);
        let select =
            build_select(Dialect::Postgres.writer(), "accounts", &[], &filter, false).unwrap();
        assert_eq!(
            select.sql,
            r#"SELECT * FROM "accounts" WHERE "nickname" IS NULL AND "credit" = $1"#
        );
        assert_eq!(select.params, [Value::Int64(Some(3))]);
    }

    #[test]
    fn date_diff() {
        let diff = |dialect: Dialect, unit: DateUnit| {
            let mut out = String::new();
            dialect.writer().write_date_diff(
                &mut Context::default(),
                &mut out,
                unit,
                "created",
                "expires",
            );
            out
        };
        assert_eq!(
            diff(Dialect::SqlServer, DateUnit::Day),
            "DATEDIFF(DAY, created, expires)"
        );
        assert_eq!(
            diff(Dialect::Postgres, DateUnit::Hour),
            "FLOOR(EXTRACT(EPOCH FROM (expires - created)) / 3600)::BIGINT"
        );
        assert_eq!(
            diff(Dialect::Postgres, DateUnit::Second),
            "FLOOR(EXTRACT(EPOCH FROM (expires - created)) / 1)::BIGINT"
        );
        assert_eq!(
            diff(Dialect::Sqlite, DateUnit::Minute),
            "CAST((julianday(expires) - julianday(created)) * 86400 / 60 AS INTEGER)"
        );
        assert_eq!(
            diff(Dialect::Sqlite, DateUnit::Day),
            "CAST((julianday(expires) - julianday(created)) * 86400 / 86400 AS INTEGER)"
        );
        assert_eq!(
            diff(Dialect::MySql, DateUnit::Second),
            "TIMESTAMPDIFF(SECOND, created, expires)"
        );
    }

    #[test]
    fn date_add() {
        let add = |dialect: Dialect, unit: DateUnit, amount: i64| {
            let mut out = String::new();
            dialect.writer().write_date_add(
                &mut Context::default(),
                &mut out,
                unit,
                amount,
                "created",
            );
            out
        };
        assert_eq!(
            add(Dialect::SqlServer, DateUnit::Minute, 30),
            "DATEADD(MINUTE, 30, created)"
        );
        assert_eq!(
            add(Dialect::Postgres, DateUnit::Day, 3),
            "(created + INTERVAL '3 day')"
        );
        assert_eq!(
            add(Dialect::Postgres, DateUnit::Hour, -2),
            "(created + INTERVAL '-2 hour')"
        );
        assert_eq!(
            add(Dialect::Sqlite, DateUnit::Day, 3),
            "datetime(created, '+3 days')"
        );
        assert_eq!(
            add(Dialect::Sqlite, DateUnit::Second, -45),
            "datetime(created, '-45 seconds')"
        );
        assert_eq!(
            add(Dialect::MySql, DateUnit::Hour, 12),
            "DATE_ADD(created, INTERVAL 12 HOUR)"
        );
    }

    #[test]
    fn quoting_is_idempotent() {
        let quote = |dialect: Dialect, identifier: &str| {
            let mut out = String::new();
            dialect
                .writer()
                .write_identifier_quoted(&mut Context::default(), &mut out, identifier);
            out
        };
        assert_eq!(quote(Dialect::Postgres, "accounts"), r#""accounts""#);
        assert_eq!(quote(Dialect::Postgres, r#""accounts""#), r#""accounts""#);
        assert_eq!(quote(Dialect::Postgres, r#"odd"name"#), r#""odd""name""#);
        assert_eq!(quote(Dialect::Postgres, "public.accounts"), "public.accounts");
        assert_eq!(quote(Dialect::MySql, "`accounts`"), "`accounts`");
        assert_eq!(quote(Dialect::SqlServer, "accounts"), "[accounts]");
        assert_eq!(quote(Dialect::SqlServer, "[accounts]"), "[accounts]");
        assert_eq!(quote(Dialect::SqlServer, "a]b"), "[a]]b]");
    }

    #[test]
    fn transaction_statements() {
        let begin = |dialect: Dialect, isolation: Option<IsolationLevel>| {
            let mut out = String::new();
            dialect.writer().write_transaction_begin(&mut out, isolation);
            out
        };
        assert_eq!(begin(Dialect::Postgres, None), "BEGIN");
        assert_eq!(
            begin(Dialect::Postgres, Some(IsolationLevel::Serializable)),
            "BEGIN ISOLATION LEVEL SERIALIZABLE"
        );
        assert_eq!(
            begin(Dialect::Sqlite, Some(IsolationLevel::Serializable)),
            "BEGIN IMMEDIATE"
        );
        assert_eq!(
            begin(Dialect::MySql, Some(IsolationLevel::ReadCommitted)),
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED;\nSTART TRANSACTION"
        );
        assert_eq!(begin(Dialect::SqlServer, None), "BEGIN TRANSACTION");
        let mut commit = String::new();
        Dialect::SqlServer
            .writer()
            .write_transaction_commit(&mut commit);
        assert_eq!(commit, "COMMIT TRANSACTION");
    }

    #[test]
    fn dialect_names() {
        for (name, dialect) in [
            ("postgresql", Dialect::Postgres),
            ("mssql", Dialect::SqlServer),
            ("SQLite", Dialect::Sqlite),
            ("mariadb", Dialect::MySql),
        ] {
            assert_eq!(name.parse::<Dialect>().unwrap(), dialect);
        }
        assert!("oracle".parse::<Dialect>().is_err());
        assert_eq!(Dialect::SqlServer.to_string(), "sqlserver");
    }
}
