#[cfg(test)]
mod tests {
    use tally_core::{Connection, Executor, Statement, Value};
    use tally_sqlite::SqliteConnection;
    use tally_tests::{init_logs, silent_logs};
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let directory = TempDir::new().expect("Could not create a temporary directory");
        let path = directory.path().join("creation.sqlite");
        assert!(!path.exists(), "Database file should not exist before test");
        SqliteConnection::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .expect("Could not open the database");
        assert!(
            path.exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=ro", path.display()))
            .await
            .expect("Could not open the database read only");
        std::fs::remove_file(&path).expect("Failed to remove the test database file");
        assert!(
            SqliteConnection::connect(&format!("sqlite://{}?mode=ro", path.display()))
                .await
                .is_err(),
            "Should not be able to open in read only unexisting database"
        );
    }

    #[tokio::test]
    async fn transactions() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://transactions?mode=memory")
            .await
            .expect("Could not open an in memory database");
        connection
            .execute(Statement::raw("CREATE TABLE t (v INTEGER)"))
            .await
            .unwrap();
        connection.begin(None).await.unwrap();
        assert!(connection.in_transaction());
        let result = connection
            .execute(Statement::new(
                "INSERT INTO t (v) VALUES (?1)",
                vec![Value::Int64(Some(5))],
            ))
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        connection.rollback().await.unwrap();
        assert!(!connection.in_transaction());
        let row = connection
            .fetch_optional(Statement::raw("SELECT COUNT(*) AS n FROM t"))
            .await
            .unwrap()
            .expect("Count returned no row");
        assert_eq!(row.get_column("n"), Some(&Value::Int64(Some(0))));
        connection.ping().await.expect("Ping failed");
    }

    #[tokio::test]
    async fn memory_database_is_shared() {
        init_logs();
        let url = "sqlite://shared?mode=memory";
        let mut first = SqliteConnection::connect(url)
            .await
            .expect("Could not open an in memory database");
        let mut second = SqliteConnection::connect(url)
            .await
            .expect("Could not open the same database twice");
        first
            .execute(Statement::raw("CREATE TABLE s (v INTEGER)"))
            .await
            .unwrap();
        first
            .execute(Statement::raw("INSERT INTO s (v) VALUES (1), (2)"))
            .await
            .unwrap();
        let row = second
            .fetch_optional(Statement::raw("SELECT COUNT(*) AS n FROM s"))
            .await
            .expect("The second connection does not see the table")
            .expect("Count returned no row");
        assert_eq!(row.get_column("n"), Some(&Value::Int64(Some(2))));

        let mut other = SqliteConnection::connect("sqlite://unrelated?mode=memory")
            .await
            .unwrap();
        silent_logs! {
            assert!(
                other
                    .fetch_optional(Statement::raw("SELECT COUNT(*) AS n FROM s"))
                    .await
                    .is_err(),
                "Differently named databases must stay apart"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("postgres://some_value")
                    .await
                    .is_err()
            );
        };
    }
}
