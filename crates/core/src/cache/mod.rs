//! In-memory snapshot cache keyed by version identifier.
//!
//! ### Freshness
//! - An entry is fresh while `now - fetched_at <= ttl` (default 5 minutes).
//! - Stale entries keep being served; the first stale hit schedules one
//!   background refresh.
//!
//! ### Singleflight
//! - Every fetch (miss or refresh) runs as a spawned task registered as the
//!   version's in-flight flight. Callers that miss while a flight is
//!   registered wait for its outcome instead of starting another fetch.
//!
//! ### Failures
//! - Failed fetches never create or update an entry.
//! - A failed refresh evicts the stale entry so the next caller fetches
//!   synchronously and sees the error.
//!
//! The state mutex is held only for map access, never across a fetch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::{Error, Snapshot};

/// Default time a snapshot stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default deadline for a single fetch run by the cache.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a fresh snapshot for a version identifier.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch and build the snapshot for `version`.
    async fn load(&self, version: &str) -> Result<Snapshot, Error>;
}

/// Outcome published to every waiter of a flight; `None` until it finishes.
type Outcome = Option<Result<Arc<Snapshot>, Error>>;

/// Cached snapshot with the time it was fetched.
struct CachedSnapshot {
    snapshot: Arc<Snapshot>,
    fetched_at: Instant,
}

impl CachedSnapshot {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// A fetch in progress for one version.
struct Flight {
    id: u64,
    outcome: watch::Receiver<Outcome>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, CachedSnapshot>,
    flights: HashMap<String, Flight>,
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    next_flight: AtomicU64,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the source in its own task so a panic surfaces as an error.
    async fn fetch(&self, version: &str) -> Result<Arc<Snapshot>, Error> {
        let source = Arc::clone(&self.source);
        let owned = version.to_string();
        let mut task = tokio::spawn(async move { source.load(&owned).await });

        match tokio::time::timeout(self.fetch_timeout, &mut task).await {
            Ok(Ok(result)) => result.map(Arc::new),
            Ok(Err(join)) => Err(Error::remote(format!("fetch task for version {version:?} failed: {join}"))),
            Err(_) => {
                task.abort();
                Err(Error::remote(format!(
                    "fetch for version {version:?} timed out after {:?}",
                    self.fetch_timeout
                )))
            }
        }
    }

    /// Record a flight's outcome and release the version's claim.
    fn settle(&self, version: &str, id: u64, outcome: &Result<Arc<Snapshot>, Error>) {
        let mut state = self.lock();
        if state.flights.get(version).is_some_and(|f| f.id == id) {
            state.flights.remove(version);
        }

        match outcome {
            Ok(snapshot) => {
                tracing::debug!(
                    version,
                    files = snapshot.len(),
                    bytes = snapshot.total_bytes(),
                    "cached snapshot"
                );
                state
                    .entries
                    .insert(version.to_string(), CachedSnapshot { snapshot: Arc::clone(snapshot), fetched_at: Instant::now() });
            }
            Err(err) => {
                if state.entries.remove(version).is_some() {
                    tracing::warn!(version, error = %err, "background refresh failed, evicting cached snapshot");
                } else {
                    tracing::debug!(version, error = %err, "fetch failed");
                }
            }
        }
    }
}

/// Releases a flight's claim if its task ends without settling.
struct FlightGuard {
    inner: Arc<Inner>,
    version: String,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        if state.flights.get(&self.version).is_some_and(|f| f.id == self.id) {
            state.flights.remove(&self.version);
            state.entries.remove(&self.version);
            tracing::warn!(version = %self.version, "fetch task ended without a result, evicting cached snapshot");
        }
    }
}

/// Shared cache of version snapshots.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<Inner>,
}

impl SnapshotCache {
    /// Create a cache backed by `source`.
    ///
    /// `fetch_timeout` bounds every fetch the cache runs, including
    /// background refreshes that no caller waits for.
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                ttl,
                fetch_timeout,
                next_flight: AtomicU64::new(0),
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Get the snapshot for `version`.
    ///
    /// Fresh and stale hits return immediately; a miss waits for the
    /// version's single in-flight fetch.
    pub async fn get(&self, version: &str) -> Result<Arc<Snapshot>, Error> {
        let pending = {
            let mut state = self.inner.lock();

            let hit = state
                .entries
                .get(version)
                .map(|cached| (Arc::clone(&cached.snapshot), cached.is_stale(self.inner.ttl)));

            if let Some((snapshot, stale)) = hit {
                if stale && !state.flights.contains_key(version) {
                    tracing::info!(
                        version,
                        ttl = ?self.inner.ttl,
                        "cached snapshot expired, refreshing in background"
                    );
                    self.start_flight(&mut state, version);
                }
                tracing::debug!(version, stale, "snapshot cache hit");
                return Ok(snapshot);
            }

            match state.flights.get(version) {
                Some(flight) => flight.outcome.clone(),
                None => self.start_flight(&mut state, version),
            }
        };

        wait(pending).await
    }

    /// Whether a fetch for `version` is in progress.
    pub fn is_fetching(&self, version: &str) -> bool {
        self.inner.lock().flights.contains_key(version)
    }

    /// Version identifiers that currently have a cached snapshot, sorted.
    pub fn cached_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.inner.lock().entries.keys().cloned().collect();
        versions.sort();
        versions
    }

    /// Drop the cached snapshot for `version`. Returns whether one existed.
    pub fn invalidate(&self, version: &str) -> bool {
        self.inner.lock().entries.remove(version).is_some()
    }

    /// Register a flight for `version` and spawn its fetch.
    fn start_flight(&self, state: &mut State, version: &str) -> watch::Receiver<Outcome> {
        let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        state.flights.insert(version.to_string(), Flight { id, outcome: rx.clone() });

        let guard = FlightGuard { inner: Arc::clone(&self.inner), version: version.to_string(), id };
        tokio::spawn(async move {
            let outcome = guard.inner.fetch(&guard.version).await;
            guard.inner.settle(&guard.version, guard.id, &outcome);
            drop(guard);
            let _ = tx.send(Some(outcome));
        });

        rx
    }

    /// Wait until no fetch for `version` is in progress.
    #[cfg(test)]
    async fn settled(&self, version: &str) {
        loop {
            let pending = self.inner.lock().flights.get(version).map(|f| f.outcome.clone());
            match pending {
                Some(rx) => {
                    let _ = wait(rx).await;
                }
                None => return,
            }
        }
    }
}

async fn wait(mut rx: watch::Receiver<Outcome>) -> Result<Arc<Snapshot>, Error> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => match &*outcome {
            Some(result) => result.clone(),
            None => Err(Error::remote("fetch finished without a result")),
        },
        Err(_) => Err(Error::remote("fetch task ended without a result")),
    }
}
