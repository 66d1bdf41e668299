#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use tally_core::{BlockingStore, Store, StoreConfig};
    use tally_sqlite::SqliteDriver;
    use tally_tests::{Account, execute_tests, init_logs};
    use tempfile::TempDir;

    static MUTEX: Mutex<()> = Mutex::new(());

    fn database(directory: &TempDir, name: &str) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            directory.path().join(name).display()
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sqlite() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let directory = TempDir::new().expect("Could not create a temporary directory");
        let store = Store::<SqliteDriver>::connect(
            &database(&directory, "tests.sqlite"),
            StoreConfig::default(),
        )
        .await
        .expect("Could not open the database");
        execute_tests(store).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn memory_store() {
        init_logs();
        let store = Store::<SqliteDriver>::connect(
            "sqlite://memory_store?mode=memory",
            StoreConfig::default(),
        )
        .await
        .expect("Could not open the in memory database");
        store
            .create_table::<Account>()
            .await
            .expect("Failed to create the table");
        store
            .insert(&Account::new(1, "ivy", 3), None)
            .await
            .expect("Failed to insert");

        // The transaction holds a connection, reads outside of it use another one
        let mut transaction = store.begin(None).await.expect("Could not begin");
        let inside = store
            .get_by_key::<Account>(1i64, Some(&mut transaction))
            .await
            .unwrap()
            .expect("Ivy is missing inside the transaction");
        assert_eq!(inside.name, "ivy");
        store.clear_cache();
        let outside = store
            .get_by_key::<Account>(1i64, None)
            .await
            .expect("A second connection must see the same database")
            .expect("Ivy is missing outside the transaction");
        assert_eq!(outside.name, "ivy");
        transaction.commit().await.expect("Failed to commit");
    }

    #[test]
    fn blocking() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let directory = TempDir::new().expect("Could not create a temporary directory");
        let store = BlockingStore::<SqliteDriver>::connect(
            &database(&directory, "blocking.sqlite"),
            StoreConfig::default().max_connections(4),
        )
        .expect("Could not open the database");
        store
            .create_table::<Account>()
            .expect("Failed to create the table");

        store
            .insert(&Account::new(1, "olga", 10), None)
            .expect("Failed to insert");
        let credit = store
            .increment::<Account, i64>(1i64, "credit", 7, None)
            .expect("Failed to increment");
        assert_eq!(credit, Some(17));

        let result = store.run_in_transaction(None, |transaction| {
            store.insert(&Account::new(2, "pat", 1), Some(&mut *transaction))?;
            store.set_field::<Account>(1i64, "name", "olga b".to_string(), Some(transaction))
        });
        assert!(result.expect("The transaction failed").is_found());
        let olga = store
            .get_by_key::<Account>(1i64, None)
            .unwrap()
            .expect("Olga is missing");
        assert_eq!(olga.name, "olga b");
        assert!(store.exists::<Account>(2i64, None).unwrap());

        let mut transaction = store.begin(None).expect("Could not begin");
        store
            .delete::<Account>(2i64, Some(&mut transaction))
            .unwrap();
        store.rollback(&mut transaction).expect("Failed to roll back");
        assert!(store.exists::<Account>(2i64, None).unwrap());
    }
}
