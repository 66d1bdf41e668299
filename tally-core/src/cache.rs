//! Row and field level cache.
//!
//! Every part of a key is length prefixed (`<len>:<text>`) behind a kind tag, `r` for whole rows
//! and `f` for single fields, so that no two rows or fields share a key whatever the key values
//! contain. Writes only ever remove entries, after the transaction that changed the row
//! committed, see [`crate::Transaction`]. Entries are filled by reads.

use crate::{EntityDescriptor, EntityKey, Result, RowLabeled, Value};
use moka::{Expiry, sync::Cache};
use std::{
    fmt::{self, Write},
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Cached payload: a whole row or a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Row(RowLabeled),
    Field(Value),
}

impl CacheEntry {
    pub fn into_row(self) -> Option<RowLabeled> {
        match self {
            CacheEntry::Row(row) => Some(row),
            CacheEntry::Field(..) => None,
        }
    }

    pub fn into_field(self) -> Option<Value> {
        match self {
            CacheEntry::Field(value) => Some(value),
            CacheEntry::Row(..) => None,
        }
    }
}

/// Key/value service holding the cache entries.
///
/// Implementations are shared by every task of the process and must not block for long.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: String, entry: CacheEntry, ttl: Duration);
    fn remove(&self, key: &str);
    fn clear(&self);
    fn stats(&self) -> Option<&CacheStats> {
        None
    }
}

/// Counters tracking cache effectiveness.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total cache misses since creation.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate between 0.0 and 1.0, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} rate={:.2}%",
            self.hits(),
            self.misses(),
            self.hit_rate() * 100.0,
        )
    }
}

struct PerEntryTtl;

impl Expiry<String, (CacheEntry, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(CacheEntry, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(CacheEntry, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-process cache backed by `moka`, each entry expires after its own ttl.
pub struct MemoryCache {
    inner: Cache<String, (CacheEntry, Duration)>,
    stats: CacheStats,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
            stats: CacheStats::default(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.inner.get(key) {
            Some((entry, _)) => {
                self.stats.record_hit();
                Some(entry)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn set(&self, key: String, entry: CacheEntry, ttl: Duration) {
        self.inner.insert(key, (entry, ttl));
    }

    fn remove(&self, key: &str) {
        self.inner.invalidate(key);
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }

    fn stats(&self) -> Option<&CacheStats> {
        Some(&self.stats)
    }
}

/// Backend that never stores anything.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoCache;

impl CacheBackend for NoCache {
    fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }
    fn set(&self, _key: String, _entry: CacheEntry, _ttl: Duration) {}
    fn remove(&self, _key: &str) {}
    fn clear(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub row_ttl: Duration,
    pub field_ttl: Duration,
    /// Longest time a row of an entity with high frequency fields may be served stale.
    pub high_frequency_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            row_ttl: Duration::from_secs(300),
            field_ttl: Duration::from_secs(60),
            high_frequency_window: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn row_ttl(mut self, ttl: Duration) -> Self {
        self.row_ttl = ttl;
        self
    }
    pub fn field_ttl(mut self, ttl: Duration) -> Self {
        self.field_ttl = ttl;
        self
    }
    pub fn high_frequency_window(mut self, window: Duration) -> Self {
        self.high_frequency_window = window;
        self
    }
}

/// A cache mutation deferred until the owning transaction commits.
///
/// Removals commute: however late a removal reaches the backend, it never leaves an older value
/// behind a newer one.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction {
    Remove(String),
}

fn push_part(out: &mut String, part: &str) {
    let _ = write!(out, "{}:{}", part.len(), part);
}

fn push_key(out: &mut String, key: &EntityKey) {
    match key {
        EntityKey::Single(v) => push_part(out, &v.to_string()),
        EntityKey::Composite(v, v2) => {
            push_part(out, &v.to_string());
            push_part(out, &v2.to_string());
        }
    }
}

/// Keying and coherence rules on top of a [`CacheBackend`].
#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoCache), CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    pub fn row_key(table: &str, key: &EntityKey) -> String {
        let mut out = String::from("r");
        push_part(&mut out, table);
        push_key(&mut out, key);
        out
    }

    pub fn field_key(table: &str, field: &str, key: &EntityKey) -> String {
        let mut out = String::from("f");
        push_part(&mut out, table);
        push_part(&mut out, field);
        push_key(&mut out, key);
        out
    }

    /// Row entries of entities with high frequency fields live at most the staleness window.
    pub fn row_ttl(&self, descriptor: &EntityDescriptor) -> Duration {
        if descriptor.has_high_frequency() {
            self.config.row_ttl.min(self.config.high_frequency_window)
        } else {
            self.config.row_ttl
        }
    }

    pub fn field_ttl(&self) -> Duration {
        self.config.field_ttl
    }

    /// Return the cached entry or call `loader`, caching what it returns.
    ///
    /// Concurrent misses on the same key all call their loader, the last one stored wins.
    pub async fn get_or_add<F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<CacheEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<CacheEntry>>>,
    {
        if let Some(entry) = self.backend.get(&key) {
            log::debug!("Cache hit `{}`", key);
            return Ok(Some(entry));
        }
        log::debug!("Cache miss `{}`", key);
        let loaded = loader().await?;
        if let Some(entry) = &loaded {
            self.backend.set(key, entry.clone(), ttl);
        }
        Ok(loaded)
    }

    /// Entries to drop after a write of `written` columns (every column when `None`).
    ///
    /// The row entry and the field entries go, except the entries of high frequency fields that
    /// were not written. A write touching only high frequency fields keeps the row entry.
    pub fn invalidation(
        descriptor: &EntityDescriptor,
        key: &EntityKey,
        written: Option<&[&str]>,
    ) -> Vec<CacheAction> {
        let is_written = |name: &str| written.is_none_or(|w| w.contains(&name));
        let only_high_frequency = written.is_some_and(|w| {
            !w.is_empty()
                && w.iter()
                    .all(|name| descriptor.column(name).is_some_and(|c| c.high_frequency))
        });
        let mut actions = Vec::new();
        if !only_high_frequency {
            actions.push(CacheAction::Remove(Self::row_key(descriptor.table, key)));
        }
        actions.extend(
            descriptor
                .columns
                .iter()
                .filter(|c| !c.is_key() && !c.uncached)
                .filter(|c| is_written(c.name) || (!only_high_frequency && !c.high_frequency))
                .map(|c| CacheAction::Remove(Self::field_key(descriptor.table, c.name, key))),
        );
        actions
    }

    /// Entries to drop after a write of the single column `field`.
    ///
    /// The new value is not stored even when the write knows it: concurrent writers reach the
    /// cache in no particular order, the next read loads the committed value.
    pub fn field_write(
        descriptor: &EntityDescriptor,
        key: &EntityKey,
        field: &str,
    ) -> Vec<CacheAction> {
        let column = descriptor.column(field);
        let mut actions = Vec::with_capacity(2);
        if !column.is_some_and(|c| c.high_frequency) {
            actions.push(CacheAction::Remove(Self::row_key(descriptor.table, key)));
        }
        actions.push(CacheAction::Remove(Self::field_key(
            descriptor.table,
            field,
            key,
        )));
        actions
    }

    pub fn apply(&self, actions: impl IntoIterator<Item = CacheAction>) {
        for action in actions {
            match action {
                CacheAction::Remove(key) => {
                    log::debug!("Cache invalidate `{}`", key);
                    self.backend.remove(&key);
                }
            }
        }
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    pub fn stats(&self) -> Option<&CacheStats> {
        self.backend.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, EntityDescriptor};

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(
            "accounts",
            vec![
                ColumnDef::new("id", Value::Int64(None)).key(),
                ColumnDef::new("credit", Value::Int64(None)),
                ColumnDef::new("messages", Value::Int64(None)).high_frequency(),
                ColumnDef::new("banned", Value::Boolean(None)).uncached(),
            ],
        )
        .unwrap()
    }

    fn removed(actions: &[CacheAction]) -> Vec<&str> {
        actions
            .iter()
            .map(|CacheAction::Remove(k)| k.as_str())
            .collect()
    }

    #[test]
    fn whole_row_write() {
        let actions = CacheLayer::invalidation(&descriptor(), &EntityKey::single(1i64), None);
        assert_eq!(
            removed(&actions),
            vec!["r8:accounts1:1", "f8:accounts6:credit1:1", "f8:accounts8:messages1:1"]
        );
    }

    #[test]
    fn regular_field_write() {
        let actions = CacheLayer::invalidation(
            &descriptor(),
            &EntityKey::single(1i64),
            Some(&["credit"]),
        );
        assert_eq!(removed(&actions), vec!["r8:accounts1:1", "f8:accounts6:credit1:1"]);
    }

    #[test]
    fn high_frequency_write() {
        let actions = CacheLayer::invalidation(
            &descriptor(),
            &EntityKey::composite(1i64, "x".to_string()),
            Some(&["messages"]),
        );
        assert_eq!(removed(&actions), vec!["f8:accounts8:messages1:11:x"]);
    }

    #[test]
    fn field_write_and_ttl() {
        let cache = CacheLayer::new(
            Arc::new(MemoryCache::default()),
            CacheConfig::default().high_frequency_window(Duration::from_secs(2)),
        );
        let descriptor = descriptor();
        assert_eq!(cache.row_ttl(&descriptor), Duration::from_secs(2));
        let key = EntityKey::single(1i64);
        let actions = CacheLayer::field_write(&descriptor, &key, "credit");
        assert_eq!(removed(&actions), vec!["r8:accounts1:1", "f8:accounts6:credit1:1"]);
        let actions = CacheLayer::field_write(&descriptor, &key, "messages");
        assert_eq!(removed(&actions), vec!["f8:accounts8:messages1:1"]);
    }

    #[test]
    fn late_field_writes_never_regress() {
        let cache = CacheLayer::new(Arc::new(MemoryCache::default()), CacheConfig::default());
        let descriptor = descriptor();
        let key = EntityKey::single(1i64);
        let field = CacheLayer::field_key("accounts", "credit", &key);
        let first = CacheLayer::field_write(&descriptor, &key, "credit");
        let second = CacheLayer::field_write(&descriptor, &key, "credit");
        // The second write reaches the cache first, then a read fills the entry
        cache.apply(second);
        cache.backend().set(
            field.clone(),
            CacheEntry::Field(Value::Int64(Some(250))),
            Duration::from_secs(60),
        );
        cache.apply(first);
        assert_eq!(cache.backend().get(&field), None);
    }

    #[test]
    fn keys_never_collide() {
        let row = |key: EntityKey| CacheLayer::row_key("players", &key);
        let field = |name: &str, key: EntityKey| CacheLayer::field_key("players", name, &key);
        assert_ne!(
            row(EntityKey::single("score:x".to_string())),
            field("score", EntityKey::single("x".to_string()))
        );
        assert_ne!(
            row(EntityKey::composite("a".to_string(), "b".to_string())),
            row(EntityKey::single("a:b".to_string()))
        );
        assert_ne!(
            row(EntityKey::composite("a:1".to_string(), "b".to_string())),
            row(EntityKey::composite("a".to_string(), "1:b".to_string()))
        );
        assert_ne!(
            CacheLayer::row_key("a", &EntityKey::single("1:b".to_string())),
            CacheLayer::row_key("a1:b", &EntityKey::single("b".to_string()))
        );
        assert_eq!(
            row(EntityKey::single(7i64)),
            row(EntityKey::single(7i32))
        );
    }

    #[tokio::test]
    async fn get_or_add_calls_loader_once() {
        let cache = CacheLayer::new(Arc::new(MemoryCache::default()), CacheConfig::default());
        let mut calls = 0;
        for _ in 0..3 {
            let entry = cache
                .get_or_add("k".into(), Duration::from_secs(60), || {
                    calls += 1;
                    async { Ok(Some(CacheEntry::Field(Value::Int32(Some(7))))) }
                })
                .await
                .unwrap();
            assert_eq!(entry, Some(CacheEntry::Field(Value::Int32(Some(7)))));
        }
        assert_eq!(calls, 1);
        let stats = cache.stats().unwrap();
        assert_eq!((stats.hits(), stats.misses()), (2, 1));
    }
}
