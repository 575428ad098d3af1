//! Read-through cache resolver
//!
//! `resolve` checks the store, and only on a miss asks the profile source,
//! writes the result back, and returns it. A present entry is never
//! re-fetched, however old; invalidation is the only way to force a refresh.
//! Failed fetches are not cached, so the next resolve tries again.
//!
//! # Concurrency
//!
//! By default two concurrent misses for the same identity both fetch and the
//! later write wins. With `single_flight` enabled, a per-identity async lock
//! wraps the check-fetch-put sequence so concurrent misses collapse into one
//! upstream request.

use crate::config::ResolverConfig;
use crate::metrics;
use crate::profile::ProfileSnapshot;
use crate::source::{ProfileSource, SourceError};
use crate::store::EntityStore;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-identity locks for in-flight fetches
type FlightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// One caller's claim on an identity's gate
///
/// Dropping the last claim removes the gate from the map.
struct Flight<'a> {
    flights: &'a FlightMap,
    identity: &'a str,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> Flight<'a> {
    fn join(flights: &'a FlightMap, identity: &'a str) -> Self {
        let mut map = flights.lock().unwrap_or_else(|e| e.into_inner());
        let gate = Arc::clone(map.entry(identity.to_string()).or_default());
        Self {
            flights,
            identity,
            gate,
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut map = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let ours = map
            .get(self.identity)
            .is_some_and(|current| Arc::ptr_eq(current, &self.gate));
        // Only the map and this claim hold the gate: nobody else is waiting
        if ours && Arc::strong_count(&self.gate) == 2 {
            map.remove(self.identity);
        }
    }
}

/// Get-or-fetch orchestration over a store and a profile source
pub struct CacheResolver {
    store: Arc<dyn EntityStore>,
    source: Arc<dyn ProfileSource>,
    fetch_timeout: Duration,
    flights: Option<FlightMap>,
}

impl CacheResolver {
    pub fn new(
        store: Arc<dyn EntityStore>,
        source: Arc<dyn ProfileSource>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            store,
            source,
            fetch_timeout: config.fetch_timeout(),
            flights: config.single_flight.then(|| Mutex::new(HashMap::new())),
        }
    }

    /// Override the upstream fetch deadline
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The store this resolver reads and writes
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn is_single_flight(&self) -> bool {
        self.flights.is_some()
    }

    /// Return the cached snapshot for `identity`, fetching it on a miss
    ///
    /// Performs at most one upstream fetch per call. On fetch failure the
    /// error kind is propagated and the store is left unchanged.
    pub async fn resolve(&self, identity: &str) -> Result<ProfileSnapshot> {
        if let Some(snapshot) = self.store.get(identity)? {
            debug!(identity, "Cache hit");
            metrics::record_cache_hit();
            return Ok(snapshot);
        }

        let Some(flights) = &self.flights else {
            metrics::record_cache_miss();
            return self.fetch_and_store(identity).await;
        };

        // Declared before the lock guard so it drops after it, including when
        // this future is cancelled mid-await
        let flight = Flight::join(flights, identity);
        let _guard = flight.gate.lock().await;
        self.resolve_gated(identity).await
    }

    /// Miss path while holding the identity's gate
    async fn resolve_gated(&self, identity: &str) -> Result<ProfileSnapshot> {
        // Another caller may have filled the entry while we waited
        if let Some(snapshot) = self.store.get(identity)? {
            debug!(identity, "Cache hit after waiting on in-flight fetch");
            metrics::record_cache_hit();
            return Ok(snapshot);
        }

        metrics::record_cache_miss();
        self.fetch_and_store(identity).await
    }

    async fn fetch_and_store(&self, identity: &str) -> Result<ProfileSnapshot> {
        let started = Instant::now();

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch_profile(identity))
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Unavailable(format!(
                    "fetch timed out after {}ms",
                    self.fetch_timeout.as_millis()
                )))
            });

        let elapsed = started.elapsed().as_secs_f64();

        match fetched {
            Ok(details) => {
                metrics::record_fetch("ok", elapsed);
                let snapshot = self.store.put(identity, details)?;
                info!(identity, elapsed_secs = elapsed, "Fetched and cached profile");
                Ok(snapshot)
            }
            Err(e) => {
                metrics::record_fetch(e.kind(), elapsed);
                warn!(identity, kind = e.kind(), error = %e, "Profile fetch failed");
                Err(e.into())
            }
        }
    }
}
