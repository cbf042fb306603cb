//! Query-result cache.
//!
//! Maps a fingerprint of `(catalog, normalized SQL)` to the id of a result the
//! server already holds, so a repeated query inside the freshness window is
//! served by `GET /api/query_results/{id}` instead of a new job.
//!
//! Freshness is evaluated against an injectable [`Clock`] rather than moka's own
//! TTL, which keeps expiry deterministic under test.

use moka::future::Cache;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Millisecond wall clock.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub result_id: i64,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Freshness window. Zero disables the cache.
    pub ttl: Duration,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    pub fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }
}

pub struct QueryResultCache {
    catalog: String,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    entries: Cache<String, CacheEntry>,
}

impl fmt::Debug for QueryResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResultCache")
            .field("catalog", &self.catalog)
            .field("ttl_ms", &self.ttl_ms)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl QueryResultCache {
    pub fn new(catalog: impl Into<String>, config: CacheConfig) -> Self {
        Self::with_clock(catalog, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        catalog: impl Into<String>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = catalog.into();
        debug!(
            target: "cache",
            catalog = %catalog,
            ttl_ms = config.ttl.as_millis() as u64,
            max_entries = config.max_entries,
            "Initializing query result cache"
        );
        Self {
            catalog,
            ttl_ms: config.ttl.as_millis() as u64,
            clock,
            entries: Cache::builder().max_capacity(config.max_entries).build(),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Stable key for a query: `<catalog>:<md5 of whitespace-normalized SQL>`.
    pub fn fingerprint(&self, query: &str) -> String {
        let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("{}:{:x}", self.catalog, md5::compute(normalized.as_bytes()))
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now_millis().saturating_sub(entry.created_at_ms) <= self.ttl_ms
    }

    /// Result id for `query` if a fresh entry exists. Stale entries are removed.
    pub async fn check_and_get(&self, query: &str) -> Option<i64> {
        if self.ttl_ms == 0 {
            return None;
        }
        let key = self.fingerprint(query);
        let entry = self.entries.get(&key).await?;
        if self.is_fresh(&entry) {
            debug!(target: "cache", key = %key, result_id = entry.result_id, "Cache hit");
            Some(entry.result_id)
        } else {
            debug!(target: "cache", key = %key, "Cache entry expired");
            self.entries.invalidate(&key).await;
            None
        }
    }

    pub async fn put(&self, query: &str, result_id: i64) {
        if self.ttl_ms == 0 {
            return;
        }
        let key = self.fingerprint(query);
        debug!(target: "cache", key = %key, result_id, "Caching result");
        self.entries
            .insert(
                key,
                CacheEntry {
                    result_id,
                    created_at_ms: self.clock.now_millis(),
                },
            )
            .await;
    }

    pub async fn invalidate(&self, query: &str) {
        self.entries.invalidate(&self.fingerprint(query)).await;
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        let expired: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry))
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.entries.invalidate(key.as_ref()).await;
        }
        if !expired.is_empty() {
            debug!(target: "cache", removed = expired.len(), "Swept expired cache entries");
        }
        expired.len()
    }

    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
