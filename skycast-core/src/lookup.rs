use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::connectivity::Connectivity;
use crate::model::LookupState;
use crate::source::WeatherSource;
use crate::store::WeatherStore;

const EMPTY_LOCATION_MESSAGE: &str = "Please enter a city name";
const NO_CACHED_DATA_MESSAGE: &str = "No cached data available";

/// Decides fetch-vs-cache per query and owns the published [`LookupState`].
///
/// Each call to [`LookupCoordinator::lookup`] takes a fresh generation
/// token; a superseded invocation's results are discarded when they arrive
/// instead of clobbering the newer query's state.
#[derive(Debug)]
pub struct LookupCoordinator {
    source: Arc<dyn WeatherSource>,
    store: WeatherStore,
    generation: AtomicU64,
    state: Mutex<LookupState>,
}

impl LookupCoordinator {
    pub fn new(source: Arc<dyn WeatherSource>, store: WeatherStore) -> Self {
        Self {
            source,
            store,
            generation: AtomicU64::new(0),
            state: Mutex::new(LookupState::default()),
        }
    }

    /// A clone of the currently published state.
    pub fn state(&self) -> LookupState {
        self.state.lock().clone()
    }

    /// Run one lookup for `location` under the given connectivity signal.
    ///
    /// Online (or unknown) connectivity goes to the remote source; a
    /// successful result is published first, then cached and appended to the
    /// history, with persistence failures logged and swallowed. Offline
    /// connectivity falls back to the cached snapshot. Every failure path
    /// leaves the coordinator ready for the next query.
    ///
    /// Returns the published state after this invocation settles; if a newer
    /// lookup superseded this one mid-flight, that newer state is returned.
    pub async fn lookup(&self, location: &str, connectivity: Connectivity) -> LookupState {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if location.trim().is_empty() {
            self.publish(token, |state| {
                state.data = None;
                state.error = Some(EMPTY_LOCATION_MESSAGE.to_string());
                state.loading = false;
            });
            return self.state();
        }

        self.publish(token, |state| {
            state.loading = true;
            state.error = None;
        });

        if connectivity.assume_online() {
            match self.source.fetch(location).await {
                Ok(snapshot) => {
                    let still_current = self.publish(token, |state| {
                        state.data = Some(snapshot.clone());
                        state.error = None;
                    });

                    // Persistence runs after the data is published and never
                    // surfaces its failures.
                    if still_current {
                        if let Err(err) = self.store.save_snapshot(&snapshot).await {
                            tracing::warn!(error = %err, "failed to cache snapshot");
                        }
                        if let Err(err) = self.store.append_history(&snapshot).await {
                            tracing::warn!(error = %err, "failed to record history entry");
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, location, "weather fetch failed");
                    self.publish(token, |state| {
                        state.data = None;
                        state.error = Some(err.user_message().to_string());
                    });
                }
            }
        } else {
            match self.store.load_snapshot().await {
                Some(snapshot) => {
                    self.publish(token, |state| {
                        state.data = Some(snapshot);
                        state.error = None;
                    });
                }
                None => {
                    self.publish(token, |state| {
                        state.data = None;
                        state.error = Some(NO_CACHED_DATA_MESSAGE.to_string());
                    });
                }
            }
        }

        self.publish(token, |state| state.loading = false);
        self.state()
    }

    /// Apply `update` only while `token` still names the newest invocation.
    fn publish(&self, token: u64, update: impl FnOnce(&mut LookupState)) -> bool {
        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != token {
            return false;
        }
        update(&mut state);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurrentConditions, WeatherSnapshot};
    use crate::source::FetchError;
    use crate::store::{MemoryStore, StoreBackend, StoreError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn snapshot(address: &str, temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            current_conditions: CurrentConditions {
                temp,
                conditions: "Cloudy".to_string(),
                humidity: 70.0,
                windspeed: 5.0,
                pressure: 1012.0,
                visibility: 10.0,
            },
            days: Vec::new(),
            resolved_address: Some(address.to_string()),
        }
    }

    /// Source replaying a fixed script of responses, one per fetch.
    #[derive(Debug)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<WeatherSnapshot, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<WeatherSnapshot, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl WeatherSource for ScriptedSource {
        async fn fetch(&self, _location: &str) -> Result<WeatherSnapshot, FetchError> {
            self.responses.lock().pop_front().expect("unscripted fetch call")
        }
    }

    /// Backend counting writes per key on top of a MemoryStore.
    #[derive(Debug, Default)]
    struct CountingBackend {
        inner: MemoryStore,
        snapshot_writes: AtomicUsize,
        history_writes: AtomicUsize,
    }

    #[async_trait]
    impl StoreBackend for CountingBackend {
        async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == "lastWeatherData" {
                self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
            } else {
                self.history_writes.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.write(key, value).await
        }
    }

    fn fetch_failure() -> FetchError {
        FetchError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            detail: "quota exceeded".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_lookup_publishes_then_persists() {
        let fetched = snapshot("Paris, France", 62.0);
        let source = Arc::new(ScriptedSource::new(vec![Ok(fetched.clone())]));
        let backend = Arc::new(CountingBackend::default());
        let store = WeatherStore::new(backend.clone());
        let coordinator = LookupCoordinator::new(source, store.clone());

        let state = coordinator.lookup("Paris", Connectivity::Online).await;

        assert_eq!(state.data, Some(fetched.clone()));
        assert!(state.error.is_none());
        assert!(!state.loading);

        assert_eq!(backend.snapshot_writes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.history_writes.load(Ordering::SeqCst), 1);
        assert_eq!(store.load_snapshot().await, Some(fetched));
        assert_eq!(store.load_history().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_location_is_rejected_without_fetching() {
        // No scripted responses: a fetch would panic.
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let backend = Arc::new(CountingBackend::default());
        let coordinator = LookupCoordinator::new(source, WeatherStore::new(backend.clone()));

        for connectivity in [Connectivity::Online, Connectivity::Offline] {
            let state = coordinator.lookup("   ", connectivity).await;

            assert!(state.data.is_none());
            assert_eq!(state.error.as_deref(), Some("Please enter a city name"));
            assert!(!state.loading);
        }

        assert_eq!(backend.snapshot_writes.load(Ordering::SeqCst), 0);
        assert_eq!(backend.history_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_generic_message_and_skips_persistence() {
        let source = Arc::new(ScriptedSource::new(vec![Err(fetch_failure())]));
        let backend = Arc::new(CountingBackend::default());
        let store = WeatherStore::new(backend.clone());
        let coordinator = LookupCoordinator::new(source, store.clone());

        let state = coordinator.lookup("Paris", Connectivity::Online).await;

        assert!(state.data.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some("City not found. Please check the spelling and try again.")
        );
        assert!(!state.loading);
        assert_eq!(backend.snapshot_writes.load(Ordering::SeqCst), 0);
        assert!(store.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_clears_previously_published_data() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(snapshot("Paris, France", 62.0)),
            Err(fetch_failure()),
        ]));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        let coordinator = LookupCoordinator::new(source, store);

        coordinator.lookup("Paris", Connectivity::Online).await;
        let state = coordinator.lookup("Nowhere", Connectivity::Online).await;

        assert!(state.data.is_none());
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn offline_lookup_returns_cached_snapshot() {
        let cached = snapshot("Paris, France", 62.0);
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        store.save_snapshot(&cached).await.unwrap();
        let coordinator = LookupCoordinator::new(source, store);

        let state = coordinator.lookup("Paris", Connectivity::Offline).await;

        assert_eq!(state.data, Some(cached));
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn offline_lookup_without_cache_reports_no_cached_data() {
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        let coordinator = LookupCoordinator::new(source, store);

        let state = coordinator.lookup("Paris", Connectivity::Offline).await;

        assert!(state.data.is_none());
        assert_eq!(state.error.as_deref(), Some("No cached data available"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn unknown_connectivity_attempts_the_fetch() {
        let fetched = snapshot("Paris, France", 62.0);
        let source = Arc::new(ScriptedSource::new(vec![Ok(fetched.clone())]));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        let coordinator = LookupCoordinator::new(source, store);

        let state = coordinator.lookup("Paris", Connectivity::Unknown).await;

        assert_eq!(state.data, Some(fetched));
    }

    #[tokio::test]
    async fn twelve_lookups_keep_the_ten_newest_history_entries() {
        let responses = (0..12)
            .map(|i| Ok(snapshot("Paris, France", f64::from(i))))
            .collect();
        let source = Arc::new(ScriptedSource::new(responses));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        let coordinator = LookupCoordinator::new(source, store.clone());

        for _ in 0..12 {
            coordinator.lookup("Paris", Connectivity::Online).await;
        }

        let log = store.load_history().await;
        assert_eq!(log.len(), 10);
        assert_eq!(log.entries()[0].snapshot.current_conditions.temp, 11.0);
        assert_eq!(log.entries()[9].snapshot.current_conditions.temp, 2.0);
    }

    /// Source that reports when a fetch starts, then blocks until released.
    #[derive(Debug)]
    struct GatedSource {
        started: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<Option<oneshot::Receiver<()>>>,
        snapshot: WeatherSnapshot,
    }

    #[async_trait]
    impl WeatherSource for GatedSource {
        async fn fetch(&self, _location: &str) -> Result<WeatherSnapshot, FetchError> {
            if let Some(started) = self.started.lock().take() {
                let _ = started.send(());
            }
            let release = self.release.lock().take();
            if let Some(release) = release {
                let _ = release.await;
            }
            Ok(self.snapshot.clone())
        }
    }

    #[tokio::test]
    async fn superseded_fetch_result_is_discarded() {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let stale = snapshot("Paris, France", 62.0);
        let cached = snapshot("London, England", 55.0);

        let source = Arc::new(GatedSource {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(Some(release_rx)),
            snapshot: stale,
        });
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        store.save_snapshot(&cached).await.unwrap();

        let coordinator = Arc::new(LookupCoordinator::new(source, store));

        let older = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.lookup("Paris", Connectivity::Online).await })
        };
        started_rx.await.expect("older fetch should start");

        // A newer query lands while the older fetch is still in flight.
        let newer = coordinator.lookup("London", Connectivity::Offline).await;
        assert_eq!(newer.data, Some(cached.clone()));

        release_tx.send(()).expect("older fetch should be waiting");
        older.await.expect("older lookup task should finish");

        let state = coordinator.state();
        assert_eq!(state.data, Some(cached));
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn coordinator_recovers_after_each_failure() {
        let fetched = snapshot("Paris, France", 62.0);
        let source = Arc::new(ScriptedSource::new(vec![
            Err(fetch_failure()),
            Ok(fetched.clone()),
        ]));
        let store = WeatherStore::new(Arc::new(MemoryStore::default()));
        let coordinator = LookupCoordinator::new(source, store);

        coordinator.lookup("", Connectivity::Online).await;
        coordinator.lookup("Paris", Connectivity::Online).await;
        let state = coordinator.lookup("Paris", Connectivity::Online).await;

        assert_eq!(state.data, Some(fetched));
        assert!(state.error.is_none());
    }
}
