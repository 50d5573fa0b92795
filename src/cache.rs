use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};

use crate::error::FetchError;
use crate::types::EventRow;

/// One cached sheet snapshot. Replaced wholesale on refresh, never patched.
#[derive(Clone)]
struct CacheEntry {
    rows: Arc<Vec<EventRow>>,
    fetched_at: Instant,
}

/// TTL-bounded memoization of sheet fetches, keyed by source id. One shared
/// instance per process, injected at startup. Cardinality stays bounded at
/// one entry per source connected during the session, so there is no eviction
/// beyond TTL staleness.
pub struct SheetCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    fetch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SheetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached rows for `source_id` if they are still within the
    /// TTL, otherwise run `fetch` and store its result. Callers get the
    /// stored snapshot itself (an `Arc`), not a copy.
    ///
    /// A failed fetch surfaces the error and leaves the map untouched; any
    /// stale entry stays in place for a later caller-controlled retry. At
    /// most one fetch per source id is in flight at a time: concurrent
    /// callers for the same id queue on the per-key lock and pick up the
    /// winner's freshly stored snapshot instead of fetching again.
    pub async fn get_rows<F, Fut>(
        &self,
        source_id: &str,
        fetch: F,
    ) -> Result<Arc<Vec<EventRow>>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<EventRow>, FetchError>>,
    {
        if let Some(rows) = self.fresh(source_id).await {
            return Ok(rows);
        }

        let lock = self.fetch_lock(source_id).await;
        let _guard = lock.lock().await;

        // Re-check under the lock: another caller may have refreshed while
        // we were queued.
        if let Some(rows) = self.fresh(source_id).await {
            return Ok(rows);
        }

        let rows = Arc::new(fetch().await?);
        tracing::debug!(source_id = %source_id, rows = rows.len(), "sheet snapshot refreshed");
        let mut entries = self.entries.write().await;
        entries.insert(
            source_id.to_string(),
            CacheEntry {
                rows: rows.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(rows)
    }

    /// Drop the entry for one source id so the next read refetches. Used when
    /// an admin reconnects a sheet. Other entries are unaffected.
    pub async fn invalidate(&self, source_id: &str) {
        self.entries.write().await.remove(source_id);
    }

    async fn fresh(&self, source_id: &str) -> Option<Arc<Vec<EventRow>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(source_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.rows.clone())
        } else {
            None
        }
    }

    async fn fetch_lock(&self, source_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.fetch_locks.lock().await;
        locks
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
