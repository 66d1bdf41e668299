use crate::{
    AsValue, Driver, Entity, EntityKey, Filter, IsolationLevel, Result, RowLabeled, Store,
    StoreConfig, Transaction, Value, WriteOutcome,
};
use std::{future::Future, sync::Arc};
use tokio::runtime::{Builder, Runtime};

/// Synchronous face of a [`Store`], for callers outside of an async context.
///
/// Every call blocks the current thread on a runtime owned by this value, so it must not be used
/// from inside an async task. Transactions begun here capture that runtime, dropping one while
/// open still rolls it back.
pub struct BlockingStore<D: Driver> {
    store: Store<D>,
    runtime: Arc<Runtime>,
}

impl<D: Driver> Clone for BlockingStore<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<D: Driver> BlockingStore<D> {
    pub fn connect(url: &str, config: StoreConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("tally-blocking")
            .enable_all()
            .build()?;
        let store = runtime.block_on(Store::connect(url, config))?;
        Ok(Self {
            store,
            runtime: Arc::new(runtime),
        })
    }

    /// The asynchronous store sharing this pool and cache.
    pub fn store(&self) -> &Store<D> {
        &self.store
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn begin(&self, isolation: Option<IsolationLevel>) -> Result<Transaction<'static, D>> {
        self.block_on(self.store.begin(isolation))
    }

    pub fn commit(&self, transaction: &mut Transaction<'_, D>) -> Result<()> {
        self.block_on(transaction.commit())
    }

    pub fn rollback(&self, transaction: &mut Transaction<'_, D>) -> Result<()> {
        self.block_on(transaction.rollback())
    }

    /// Run `action` in a transaction, see [`Store::run_in_transaction`].
    pub fn run_in_transaction<T>(
        &self,
        existing: Option<&mut Transaction<'_, D>>,
        action: impl FnOnce(&mut Transaction<'_, D>) -> Result<T>,
    ) -> Result<T> {
        match existing {
            Some(existing) => {
                let mut view = existing.view()?;
                let result = action(&mut view);
                self.finish(&mut view, result)
            }
            None => {
                let mut transaction = self.begin(None)?;
                let result = action(&mut transaction);
                self.finish(&mut transaction, result)
            }
        }
    }

    fn finish<T>(&self, transaction: &mut Transaction<'_, D>, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit(transaction)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback(transaction) {
                    log::error!("{:#}", rollback.context("While rolling back after a failure"));
                }
                Err(e)
            }
        }
    }

    pub fn get_by_key<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<E>> {
        self.block_on(self.store.get_by_key(key, transaction))
    }

    pub fn select_for_update<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: &mut Transaction<'_, D>,
    ) -> Result<Option<E>> {
        self.block_on(self.store.select_for_update(key, transaction))
    }

    pub fn exists<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<bool> {
        self.block_on(self.store.exists::<E>(key, transaction))
    }

    pub fn count<E: Entity>(
        &self,
        filter: &Filter,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<u64> {
        self.block_on(self.store.count::<E>(filter, transaction))
    }

    pub fn select<E: Entity>(
        &self,
        filter: &Filter,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<E>> {
        self.block_on(self.store.select(filter, transaction))
    }

    pub fn get_field<E: Entity, T: AsValue>(
        &self,
        field: &str,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<T>> {
        self.block_on(self.store.get_field::<E, T>(field, key, transaction))
    }

    pub fn insert<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<EntityKey> {
        self.block_on(self.store.insert(entity, transaction))
    }

    pub fn update<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.update(entity, transaction))
    }

    pub fn update_columns<E: Entity>(
        &self,
        entity: &E,
        columns: &[&str],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.update_columns(entity, columns, transaction))
    }

    pub fn set_field<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        field: &str,
        value: impl AsValue,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.set_field::<E>(key, field, value, transaction))
    }

    pub fn delete<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.delete::<E>(key, transaction))
    }

    pub fn upsert<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.upsert(entity, transaction))
    }

    pub fn increment<E: Entity, T: AsValue>(
        &self,
        key: impl Into<EntityKey>,
        field: &str,
        delta: T,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<T>> {
        self.block_on(self.store.increment::<E, T>(key, field, delta, transaction))
    }

    pub fn query_raw(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<RowLabeled>> {
        self.block_on(self.store.query_raw(template, args, transaction))
    }

    pub fn query_as<E: Entity>(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<E>> {
        self.block_on(self.store.query_as::<E>(template, args, transaction))
    }

    pub fn execute_raw(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        self.block_on(self.store.execute_raw(template, args, transaction))
    }

    pub fn create_table<E: Entity>(&self) -> Result<()> {
        self.block_on(self.store.create_table::<E>())
    }

    pub fn invalidate<E: Entity>(&self, key: impl Into<EntityKey>) {
        self.store.invalidate::<E>(key)
    }

    pub fn clear_cache(&self) {
        self.store.clear_cache()
    }
}
