//! Cache-coherent CRUD facade over a connection pool.

use crate::{
    AsValue, CacheBackend, CacheConfig, CacheEntry, CacheLayer, CacheStats, Connection, Driver,
    EngineError, Entity, EntityDescriptor, EntityKey, Error, ErrorContext, Executor, Filter,
    IsolationLevel, MappingMode, MemoryCache, NoCache, Pool, PooledConnection, Result, RowLabeled,
    RowsAffected, Statement, Transaction, Value, WriteOutcome, acquire, build_count,
    build_create_table, build_delete, build_exists, build_increment, build_insert, build_pool,
    build_select, build_update, build_upsert, resolve_template, truncate_long,
};
use std::sync::Arc;

/// Run `$body` inside the caller's transaction when there is one, or inside a new transaction
/// committed on success and rolled back on failure. `$body` evaluates to the plain value and may
/// use `?`.
macro_rules! with_transaction {
    ($store:expr, $transaction:expr, |$t:ident| $body:block) => {
        match $transaction {
            Some($t) => async { Ok::<_, Error>($body) }.await,
            None => {
                let mut owned = $store.begin(None).await?;
                let result = {
                    let $t = &mut owned;
                    async { Ok::<_, Error>($body) }.await
                };
                finish(&mut owned, result).await
            }
        }
    };
}

fn failed(error: Error, sql: &str) -> Error {
    let error = error.context(format!("While executing the query:\n{}", truncate_long!(sql)));
    log::error!("{:#}", error);
    error
}

async fn fetch_optional<E: Executor>(
    executor: &mut E,
    statement: Statement,
) -> Result<Option<RowLabeled>> {
    let sql = statement.sql.clone();
    executor
        .fetch_optional(statement)
        .await
        .map_err(|e| failed(e, &sql))
}

async fn fetch_all<E: Executor>(executor: &mut E, statement: Statement) -> Result<Vec<RowLabeled>> {
    let sql = statement.sql.clone();
    executor
        .fetch_all(statement)
        .await
        .map_err(|e| failed(e, &sql))
}

async fn execute<E: Executor>(executor: &mut E, statement: Statement) -> Result<RowsAffected> {
    let sql = statement.sql.clone();
    executor
        .execute(statement)
        .await
        .map_err(|e| failed(e, &sql))
}

/// Commit on success, otherwise roll back and return the error of the action.
async fn finish<D: Driver, T>(transaction: &mut Transaction<'_, D>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            transaction.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = transaction.rollback().await {
                log::error!("{:#}", rollback.context("While rolling back after a failure"));
            }
            Err(e)
        }
    }
}

/// A generated key counts as absent when it is null or holds the default of its type.
fn is_default_key(value: &Value) -> bool {
    match value {
        Value::Int32(Some(0)) | Value::Int64(Some(0)) => true,
        Value::Varchar(Some(v)) => v.is_empty(),
        v => v.is_null(),
    }
}

/// Generated key reported as a row id, in the type of the key column.
fn generated_key(prototype: &Value, id: i64) -> Result<Value> {
    Ok(match prototype {
        Value::Int32(..) => Value::Int32(Some(
            i32::try_from(id).with_context(|| format!("Generated key {} overflows i32", id))?,
        )),
        Value::Int64(..) => Value::Int64(Some(id)),
        Value::Varchar(..) => Value::Varchar(Some(id.to_string())),
        v => {
            return Err(Error::msg(format!(
                "Generated key {} cannot be stored into {:?}",
                id, v
            )));
        }
    })
}

/// Settings of a [`Store`].
#[derive(Clone)]
pub struct StoreConfig {
    /// Maximum number of pooled connections.
    pub max_connections: usize,
    pub cache: CacheConfig,
    pub mapping: MappingMode,
    /// Backend holding the cache entries, an in-process [`MemoryCache`] when `None`.
    pub cache_backend: Option<Arc<dyn CacheBackend>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            cache: CacheConfig::default(),
            mapping: MappingMode::Lenient,
            cache_backend: None,
        }
    }
}

impl StoreConfig {
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
    /// Fail on conversion errors while mapping rows instead of falling back to defaults.
    pub fn strict_mapping(mut self, strict: bool) -> Self {
        self.mapping = if strict {
            MappingMode::Strict
        } else {
            MappingMode::Lenient
        };
        self
    }
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }
    pub fn without_cache(self) -> Self {
        self.cache_backend(Arc::new(NoCache))
    }
}

struct Shared<D: Driver> {
    pool: Pool<D>,
    cache: CacheLayer,
    mapping: MappingMode,
}

/// Entry point of the engine: typed reads and writes with a row and field cache kept coherent
/// with the database.
///
/// Every operation takes an optional transaction. With `None` reads go through the cache and
/// writes run in their own transaction. With a transaction reads hit the database directly and
/// the cache changes of writes wait for the owning transaction to commit.
///
/// Cloning is cheap, clones share the pool and the cache.
pub struct Store<D: Driver> {
    inner: Arc<Shared<D>>,
}

impl<D: Driver> Clone for Store<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Driver> Store<D> {
    /// Build the pool for `url` and check that a connection can be opened.
    pub async fn connect(url: &str, config: StoreConfig) -> Result<Self> {
        let prefix = format!("{}://", D::NAME);
        if !url.starts_with(&prefix) {
            return Err(Error::msg(format!(
                "Expected {} connection url to start with `{}`",
                D::NAME,
                prefix
            )));
        }
        let pool = build_pool::<D>(url, config.max_connections)?;
        drop(
            acquire(&pool)
                .await
                .with_context(|| format!("While connecting to the {} database", D::NAME))?,
        );
        log::info!("Connected to {}", D::NAME);
        Ok(Self::new(pool, config))
    }

    pub fn new(pool: Pool<D>, config: StoreConfig) -> Self {
        let backend = config
            .cache_backend
            .unwrap_or_else(|| Arc::new(MemoryCache::default()) as Arc<dyn CacheBackend>);
        Self {
            inner: Arc::new(Shared {
                pool,
                cache: CacheLayer::new(backend, config.cache),
                mapping: config.mapping,
            }),
        }
    }

    pub fn pool(&self) -> &Pool<D> {
        &self.inner.pool
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.inner.cache
    }

    pub fn cache_stats(&self) -> Option<&CacheStats> {
        self.inner.cache.stats()
    }

    async fn acquire(&self) -> Result<PooledConnection<D>> {
        acquire(&self.inner.pool).await
    }

    /// Open an owning transaction on a connection of the pool.
    pub async fn begin(&self, isolation: Option<IsolationLevel>) -> Result<Transaction<'static, D>> {
        let mut connection = self.acquire().await?;
        connection
            .begin(isolation)
            .await
            .context("While beginning a transaction")?;
        log::debug!("Transaction begun");
        Ok(Transaction::owning(connection, self.inner.cache.clone()))
    }

    /// Run `action` in a transaction.
    ///
    /// With `existing` the action receives a view over it and the caller stays in charge of the
    /// outcome. Otherwise a new transaction is begun, committed when `action` succeeds and rolled
    /// back when it fails.
    pub async fn run_in_transaction<T>(
        &self,
        existing: Option<&mut Transaction<'_, D>>,
        action: impl AsyncFnOnce(&mut Transaction<'_, D>) -> Result<T>,
    ) -> Result<T> {
        match existing {
            Some(existing) => {
                let mut view = existing.view()?;
                let result = action(&mut view).await;
                finish(&mut view, result).await
            }
            None => {
                let mut transaction = self.begin(None).await?;
                let result = action(&mut transaction).await;
                finish(&mut transaction, result).await
            }
        }
    }

    fn row_cacheable(descriptor: &EntityDescriptor) -> bool {
        !descriptor.columns.iter().any(|c| c.uncached)
    }

    fn select_by_key(
        descriptor: &EntityDescriptor,
        key: &EntityKey,
        columns: &[&str],
        lock: bool,
    ) -> Result<Statement> {
        let mut filter = Filter::new();
        filter.conditions = descriptor
            .key_filter(key)?
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        build_select(D::sql_writer(), descriptor.table, columns, &filter, lock)
    }

    fn map<E: Entity>(&self, row: &RowLabeled) -> Result<E> {
        E::from_row_with(row, self.inner.mapping)
    }

    /// Row of `key`, from the cache unless a transaction is given.
    pub async fn get_by_key<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<E>> {
        let descriptor = E::descriptor();
        let key = key.into();
        let statement = Self::select_by_key(descriptor, &key, &descriptor.column_names(), false)?;
        let row = match transaction {
            Some(transaction) => fetch_optional(transaction.connection()?, statement).await?,
            None if Self::row_cacheable(descriptor) => {
                let cache = &self.inner.cache;
                cache
                    .get_or_add(
                        CacheLayer::row_key(descriptor.table, &key),
                        cache.row_ttl(descriptor),
                        || async move {
                            let mut connection = self.acquire().await?;
                            let row = fetch_optional(&mut *connection, statement).await?;
                            Ok(row.map(CacheEntry::Row))
                        },
                    )
                    .await?
                    .and_then(CacheEntry::into_row)
            }
            None => {
                let mut connection = self.acquire().await?;
                fetch_optional(&mut *connection, statement).await?
            }
        };
        row.map(|row| self.map(&row)).transpose()
    }

    /// Read the row of `key` locking it until `transaction` ends.
    pub async fn select_for_update<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: &mut Transaction<'_, D>,
    ) -> Result<Option<E>> {
        let descriptor = E::descriptor();
        let statement =
            Self::select_by_key(descriptor, &key.into(), &descriptor.column_names(), true)?;
        let row = fetch_optional(transaction.connection()?, statement).await?;
        row.map(|row| self.map(&row)).transpose()
    }

    pub async fn exists<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<bool> {
        let descriptor = E::descriptor();
        let key = key.into();
        let statement = build_exists(
            D::sql_writer(),
            descriptor.table,
            &descriptor.key_filter(&key)?,
        )?;
        let row = match transaction {
            Some(transaction) => fetch_optional(transaction.connection()?, statement).await?,
            None => {
                let row_key = CacheLayer::row_key(descriptor.table, &key);
                if Self::row_cacheable(descriptor)
                    && self.inner.cache.backend().get(&row_key).is_some()
                {
                    return Ok(true);
                }
                let mut connection = self.acquire().await?;
                fetch_optional(&mut *connection, statement).await?
            }
        };
        Ok(row.is_some())
    }

    /// Number of rows matching the equality conditions of `filter`.
    pub async fn count<E: Entity>(
        &self,
        filter: &Filter,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<u64> {
        let descriptor = E::descriptor();
        for (column, _) in &filter.conditions {
            descriptor.require_column(column)?;
        }
        let statement = build_count(D::sql_writer(), descriptor.table, filter)?;
        let row = match transaction {
            Some(transaction) => fetch_optional(transaction.connection()?, statement).await?,
            None => {
                let mut connection = self.acquire().await?;
                fetch_optional(&mut *connection, statement).await?
            }
        };
        let Some(value) = row.as_ref().and_then(|r| r.values().first()) else {
            return Ok(0);
        };
        u64::try_from(i64::try_from_value(value.clone())?).context("Negative row count")
    }

    /// Rows matching `filter`, never cached.
    pub async fn select<E: Entity>(
        &self,
        filter: &Filter,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<E>> {
        let descriptor = E::descriptor();
        for (column, _) in &filter.conditions {
            descriptor.require_column(column)?;
        }
        for (column, _) in &filter.order {
            descriptor.require_column(column)?;
        }
        let statement = build_select(
            D::sql_writer(),
            descriptor.table,
            &descriptor.column_names(),
            filter,
            false,
        )?;
        let rows = match transaction {
            Some(transaction) => fetch_all(transaction.connection()?, statement).await?,
            None => {
                let mut connection = self.acquire().await?;
                fetch_all(&mut *connection, statement).await?
            }
        };
        rows.iter().map(|row| self.map(row)).collect()
    }

    /// Single column of the row of `key`.
    ///
    /// Returns `None` when the row does not exist or the stored value is null. Outside of a
    /// transaction the value comes from the field cache unless the column is uncached.
    pub async fn get_field<E: Entity, T: AsValue>(
        &self,
        field: &str,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<T>> {
        let descriptor = E::descriptor();
        let column = descriptor.require_column(field)?;
        let key = key.into();
        let statement = Self::select_by_key(descriptor, &key, &[column.name], false)?;
        let value = match transaction {
            Some(transaction) => fetch_optional(transaction.connection()?, statement)
                .await?
                .and_then(|row| row.get_column(column.name).cloned()),
            None if !column.uncached => {
                let cache = &self.inner.cache;
                cache
                    .get_or_add(
                        CacheLayer::field_key(descriptor.table, column.name, &key),
                        cache.field_ttl(),
                        || async move {
                            let mut connection = self.acquire().await?;
                            let row = fetch_optional(&mut *connection, statement).await?;
                            Ok(row
                                .and_then(|row| row.get_column(column.name).cloned())
                                .map(CacheEntry::Field))
                        },
                    )
                    .await?
                    .and_then(CacheEntry::into_field)
            }
            None => {
                let mut connection = self.acquire().await?;
                fetch_optional(&mut *connection, statement)
                    .await?
                    .and_then(|row| row.get_column(column.name).cloned())
            }
        };
        match value {
            Some(value) if !value.is_null() => T::try_from_value(value)
                .map(Some)
                .with_context(|| format!("While reading `{}`.`{}`", descriptor.table, field)),
            _ => Ok(None),
        }
    }

    /// Insert `entity` and return its key.
    ///
    /// A generated key left at its default is omitted from the statement and read back from the
    /// database.
    pub async fn insert<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<EntityKey> {
        let descriptor = E::descriptor();
        let writer = D::sql_writer();
        let fields = entity.extract_fields()?;
        let generated = match descriptor.key_columns().as_slice() {
            [key] if key.generated => fields
                .iter()
                .find(|(name, _)| *name == key.name)
                .is_none_or(|(_, v)| is_default_key(v))
                .then_some(*key),
            _ => None,
        };
        let excluded = generated.map(|c| vec![c.name]).unwrap_or_default();
        let returning = if writer.supports_returning() {
            excluded.clone()
        } else {
            Vec::new()
        };
        let statement = build_insert(writer, descriptor.table, &fields, &returning, &excluded);
        with_transaction!(self, transaction, |transaction| {
            let connection = transaction.connection()?;
            let key = match generated {
                None => {
                    execute(connection, statement).await?;
                    entity.primary_key()
                }
                Some(column) if !returning.is_empty() => {
                    let row = fetch_optional(connection, statement).await?;
                    let value = row
                        .as_ref()
                        .and_then(|r| r.get_column(column.name))
                        .cloned()
                        .ok_or_else(|| {
                            Error::msg(format!(
                                "The insert into `{}` did not return the generated key",
                                descriptor.table
                            ))
                        })?;
                    EntityKey::Single(value)
                }
                Some(column) => {
                    let result = execute(connection, statement).await?;
                    let Some(id) = result.last_affected_id else {
                        return Err(EngineError::Unsupported {
                            dialect: writer.name(),
                            feature: "reading back generated keys",
                        }
                        .into());
                    };
                    EntityKey::Single(generated_key(&column.value, id)?)
                }
            };
            transaction.defer(CacheLayer::invalidation(descriptor, &key, None));
            key
        })
    }

    /// Write every non key column of `entity`.
    pub async fn update<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        let fields = entity
            .extract_fields()?
            .into_iter()
            .filter(|(name, _)| descriptor.column(name).is_some_and(|c| !c.is_key()))
            .collect::<Vec<_>>();
        self.write_columns::<E>(entity.primary_key(), fields, None, transaction)
            .await
    }

    /// Write only `columns` of `entity`.
    pub async fn update_columns<E: Entity>(
        &self,
        entity: &E,
        columns: &[&str],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        for column in columns {
            if descriptor.require_column(column)?.is_key() {
                return Err(Error::msg(format!(
                    "Key column `{}` of `{}` cannot be updated",
                    column, descriptor.table
                )));
            }
        }
        let fields = entity
            .extract_fields()?
            .into_iter()
            .filter(|(name, _)| columns.contains(name))
            .collect::<Vec<_>>();
        self.write_columns::<E>(entity.primary_key(), fields, Some(columns), transaction)
            .await
    }

    async fn write_columns<E: Entity>(
        &self,
        key: EntityKey,
        fields: Vec<(&'static str, Value)>,
        written: Option<&[&str]>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        let statement = build_update(
            D::sql_writer(),
            descriptor.table,
            &fields,
            &descriptor.key_filter(&key)?,
            &[],
        )?;
        with_transaction!(self, transaction, |transaction| {
            let result = execute(transaction.connection()?, statement).await?;
            transaction.defer(CacheLayer::invalidation(descriptor, &key, written));
            WriteOutcome::from(result)
        })
    }

    /// Write a single column. Its cache entry is dropped on commit, along with the cached row
    /// unless the column is high frequency.
    pub async fn set_field<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        field: &str,
        value: impl AsValue,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        let column = descriptor.require_column(field)?;
        if column.is_key() {
            return Err(Error::msg(format!(
                "Key column `{}` of `{}` cannot be updated",
                field, descriptor.table
            )));
        }
        let key = key.into();
        let statement = build_update(
            D::sql_writer(),
            descriptor.table,
            &[(column.name, value.as_value())],
            &descriptor.key_filter(&key)?,
            &[],
        )?;
        with_transaction!(self, transaction, |transaction| {
            let outcome = WriteOutcome::from(execute(transaction.connection()?, statement).await?);
            transaction.defer(CacheLayer::field_write(descriptor, &key, column.name));
            outcome
        })
    }

    pub async fn delete<E: Entity>(
        &self,
        key: impl Into<EntityKey>,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        let key = key.into();
        let statement = build_delete(
            D::sql_writer(),
            descriptor.table,
            &descriptor.key_filter(&key)?,
        )?;
        with_transaction!(self, transaction, |transaction| {
            let result = execute(transaction.connection()?, statement).await?;
            transaction.defer(CacheLayer::invalidation(descriptor, &key, None));
            WriteOutcome::from(result)
        })
    }

    /// Insert `entity`, or update every non key column when its key already exists.
    pub async fn upsert<E: Entity>(
        &self,
        entity: &E,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let descriptor = E::descriptor();
        let key = entity.primary_key();
        if key.is_unset() {
            return Err(Error::msg(format!(
                "Upsert into `{}` requires the key to be set",
                descriptor.table
            )));
        }
        let fields = entity.extract_fields()?;
        let statement = build_upsert(
            D::sql_writer(),
            descriptor.table,
            &fields,
            &descriptor.key_names(),
        )?;
        with_transaction!(self, transaction, |transaction| {
            let result = execute(transaction.connection()?, statement).await?;
            transaction.defer(CacheLayer::invalidation(descriptor, &key, None));
            WriteOutcome::from(result)
        })
    }

    /// Atomically add `delta` to `field` and return the new value, `None` when the row does not
    /// exist. A null field counts as zero.
    pub async fn increment<E: Entity, T: AsValue>(
        &self,
        key: impl Into<EntityKey>,
        field: &str,
        delta: T,
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Option<T>> {
        let descriptor = E::descriptor();
        let writer = D::sql_writer();
        let column = descriptor.require_column(field)?;
        if column.is_key() {
            return Err(Error::msg(format!(
                "Key column `{}` of `{}` cannot be incremented",
                field, descriptor.table
            )));
        }
        let key = key.into();
        let key_filter = descriptor.key_filter(&key)?;
        let statement = build_increment(
            writer,
            descriptor.table,
            column.name,
            delta.as_value(),
            &key_filter,
        )?;
        let value = with_transaction!(self, transaction, |transaction| {
            let connection = transaction.connection()?;
            let value = if writer.supports_returning() {
                fetch_optional(connection, statement)
                    .await?
                    .and_then(|row| row.get_column(column.name).cloned())
            } else {
                // The row stays locked by the update until the end of the transaction
                let result = execute(&mut *connection, statement).await?;
                if result.rows_affected == 0 {
                    None
                } else {
                    let select = Self::select_by_key(descriptor, &key, &[column.name], false)?;
                    fetch_optional(connection, select)
                        .await?
                        .and_then(|row| row.get_column(column.name).cloned())
                }
            };
            if value.is_some() {
                transaction.defer(CacheLayer::field_write(descriptor, &key, column.name));
            }
            value
        })?;
        value.map(T::try_from_value).transpose()
    }

    /// Rows of a raw `{0}`, `{1}`, … template, arguments are always bound.
    pub async fn query_raw(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<RowLabeled>> {
        let statement = resolve_template(D::sql_writer(), template, args)?;
        match transaction {
            Some(transaction) => fetch_all(transaction.connection()?, statement).await,
            None => {
                let mut connection = self.acquire().await?;
                fetch_all(&mut *connection, statement).await
            }
        }
    }

    /// Like [`Store::query_raw`], mapping each row to `E`.
    pub async fn query_as<E: Entity>(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<Vec<E>> {
        let rows = self.query_raw(template, args, transaction).await?;
        rows.iter().map(|row| self.map(row)).collect()
    }

    /// Execute a raw template. The cache is not touched, see [`Store::invalidate`].
    pub async fn execute_raw(
        &self,
        template: &str,
        args: &[Value],
        transaction: Option<&mut Transaction<'_, D>>,
    ) -> Result<WriteOutcome> {
        let statement = resolve_template(D::sql_writer(), template, args)?;
        let result = match transaction {
            Some(transaction) => execute(transaction.connection()?, statement).await?,
            None => {
                let mut connection = self.acquire().await?;
                execute(&mut *connection, statement).await?
            }
        };
        Ok(result.into())
    }

    /// Create the table of `E` unless it exists.
    pub async fn create_table<E: Entity>(&self) -> Result<()> {
        let statement = build_create_table(D::sql_writer(), E::descriptor());
        let mut connection = self.acquire().await?;
        execute(&mut *connection, statement).await?;
        Ok(())
    }

    /// Drop every cache entry of the row of `key`.
    pub fn invalidate<E: Entity>(&self, key: impl Into<EntityKey>) {
        self.inner
            .cache
            .apply(CacheLayer::invalidation(E::descriptor(), &key.into(), None));
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }
}
