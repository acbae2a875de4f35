//! Process-wide registry cache
//!
//! Maps a discovery-source id to the last catalogue it produced and when.
//! Entries are fresh for a fixed TTL window. The cache also owns the
//! single-flight table: while a fetch for a chain is running, every other
//! caller for that chain awaits the same future instead of starting a new
//! request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::constants::defaults;
use crate::error::Result;
use crate::types::Catalog;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Catalog>>>>;

static SHARED_CACHE: Lazy<Arc<RegistryCache>> = Lazy::new(|| {
    Arc::new(RegistryCache::new(Duration::from_secs(
        defaults::REGISTRY_TTL_SECS,
    )))
});

/// A cached catalogue with the time it was fetched
#[derive(Debug, Clone)]
pub struct CachedCatalog {
    pub catalog: Arc<Catalog>,
    pub fetched_at: Instant,
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

/// TTL-bounded catalogue cache with single-flight fetch coordination
pub struct RegistryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedCatalog>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    generation: Mutex<u64>,
}

impl RegistryCache {
    /// Create a standalone cache (tests, isolated editors)
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: Mutex::new(0),
        }
    }

    /// The cache shared by every editor in this process
    pub fn shared() -> Arc<Self> {
        SHARED_CACHE.clone()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The catalogue cached for `source_id`, if still within the TTL window
    pub fn get_fresh(&self, source_id: &str) -> Option<Arc<Catalog>> {
        let entries = self.entries.lock();
        entries
            .get(source_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.catalog.clone())
    }

    pub fn is_fresh(&self, source_id: &str) -> bool {
        self.get_fresh(source_id).is_some()
    }

    /// Raw entry lookup, ignoring freshness
    pub fn entry(&self, source_id: &str) -> Option<CachedCatalog> {
        self.entries.lock().get(source_id).cloned()
    }

    /// Record a successful fetch
    pub fn store(&self, source_id: &str, catalog: Arc<Catalog>) {
        self.entries.lock().insert(
            source_id.to_string(),
            CachedCatalog {
                catalog,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for one source
    pub fn invalidate(&self, source_id: &str) {
        self.entries.lock().remove(source_id);
    }

    /// Drop every entry
    ///
    /// In-flight fetches are left alone; they still resolve for the callers
    /// already attached to them.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Whether a fetch for `key` is currently running
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Run `start` unless a fetch for `key` is already in flight, in which
    /// case attach to that fetch
    pub async fn single_flight<F, Fut>(&self, key: &str, start: F) -> Result<Arc<Catalog>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<Catalog>>> + Send + 'static,
    {
        let (generation, fetch) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key) {
                Some(existing) => {
                    log::debug!("Attaching to in-flight discovery for '{}'", key);
                    (existing.generation, existing.fetch.clone())
                }
                None => {
                    let generation = {
                        let mut counter = self.generation.lock();
                        *counter += 1;
                        *counter
                    };
                    let fetch = start().boxed().shared();
                    in_flight.insert(
                        key.to_string(),
                        InFlight {
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).map(|f| f.generation) == Some(generation) {
            in_flight.remove(key);
        }
        result
    }
}
