//! Fetch coordination: request coalescing and staleness policy.
//!
//! Multiple independent observers (a detail screen and a sidebar, say) may
//! ask for the same key at the same time. `ensure` guarantees at most one
//! remote load per key is in flight: the first caller installs a shared
//! future, later callers join it, and every waiter receives the same
//! outcome - success or failure. Failures never touch the store.
//!
//! A load that resolves after a newer write landed on its key (an
//! optimistic mutation confirming mid-flight) is discarded by the store's
//! version guard; callers then receive the newer cached value.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use futures::future::{Future, FutureExt, Shared};
use tracing::{debug, warn};

use crate::api::ApiError;

use super::key::CacheKey;
use super::store::{CachedValue, EntityStore};

type LoadFuture = Pin<Box<dyn Future<Output = Result<CachedValue, ApiError>> + Send>>;
type SharedLoad = Shared<LoadFuture>;

/// Deduplicates concurrent fetches per key and applies the staleness
/// policy on reads.
pub struct FetchCoordinator {
    store: Arc<EntityStore>,
    in_flight: Arc<Mutex<HashMap<CacheKey, SharedLoad>>>,
    stale_after: Duration,
}

impl FetchCoordinator {
    pub fn new(store: Arc<EntityStore>, stale_minutes: i64) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stale_after: Duration::minutes(stale_minutes),
        }
    }

    /// Return the cached value for `key`, loading it remotely if absent or
    /// stale. Concurrent callers for the same key share one remote load.
    pub async fn ensure<F>(&self, key: CacheKey, loader: F) -> Result<CachedValue, ApiError>
    where
        F: Future<Output = Result<CachedValue, ApiError>> + Send + 'static,
    {
        if let Some(entry) = self.store.get(&key) {
            if entry.is_fresh(self.stale_after) {
                debug!(key = %key, version = entry.version, "ensure: served from cache");
                return Ok(entry.value);
            }
        }
        self.load(key, loader).await
    }

    /// Force a remote load for `key`, bypassing the freshness check.
    /// Still coalesces with any load already in flight.
    pub async fn refetch<F>(&self, key: CacheKey, loader: F) -> Result<CachedValue, ApiError>
    where
        F: Future<Output = Result<CachedValue, ApiError>> + Send + 'static,
    {
        self.load(key, loader).await
    }

    async fn load<F>(&self, key: CacheKey, loader: F) -> Result<CachedValue, ApiError>
    where
        F: Future<Output = Result<CachedValue, ApiError>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(existing) = in_flight.get(&key) {
                debug!(key = %key, "ensure: joining in-flight fetch");
                existing.clone()
            } else {
                // Version observed at issue time; the store rejects the
                // result if anything newer lands before the load resolves.
                let expected = self.store.get(&key).map(|e| e.version);
                let store = Arc::clone(&self.store);
                let registry = Arc::clone(&self.in_flight);
                let load_key = key.clone();

                let fut: LoadFuture = Box::pin(async move {
                    let result = loader.await;
                    lock(&registry).remove(&load_key);
                    match result {
                        Ok(value) => {
                            if !store.set_if_version(&load_key, value.clone(), expected) {
                                debug!(key = %load_key, "fetch result superseded by newer write");
                                if let Some(entry) = store.get(&load_key) {
                                    return Ok(entry.value);
                                }
                            }
                            Ok(value)
                        }
                        Err(err) => {
                            warn!(key = %load_key, error = %err, "remote load failed");
                            Err(err)
                        }
                    }
                });
                let shared = fut.shared();
                in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        shared.await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Tests
// ============================================================================
