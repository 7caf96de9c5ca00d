//! Live location reporter
//!
//! Foreground supplement to the background task: while the owning screen is
//! up, a platform position watch keeps the latest sample in memory and a
//! fixed-interval loop pushes it to the driver's Location resource on the
//! backend. The loop is best-effort — a failed push is logged and the next
//! tick retries unconditionally with whatever the latest sample is, with no
//! backoff and no de-duplication.
//!
//! Pushes only happen when the signed-in user is a driver and a destination
//! Location id is known; otherwise ticks are silent no-ops.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::LocationUpdater;
use crate::config::ReporterConfig;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::platform::{Geolocator, LocationUpdateOptions, WatchId};
use crate::types::{AppContext, LocationSample, LocationUpdate};

/// Capacity of the position-watch sample channel.
const SAMPLE_CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
struct ReporterState {
    watch: Option<WatchId>,
    sampler: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

/// Periodically forwards the device's latest position to the backend.
pub struct LiveLocationReporter {
    geolocator: Arc<dyn Geolocator>,
    /// None when the API is not configured; ticks then do nothing
    updater: Option<Arc<dyn LocationUpdater>>,
    context: Arc<AppContext>,
    journal: Journal,
    interval: Duration,
    watch_options: LocationUpdateOptions,
    /// Latest position fix; shared with the sampler task
    current: Arc<RwLock<Option<LocationSample>>>,
    state: Mutex<ReporterState>,
}

impl LiveLocationReporter {
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        updater: Option<Arc<dyn LocationUpdater>>,
        context: Arc<AppContext>,
        journal: Journal,
        config: &ReporterConfig,
        watch_options: LocationUpdateOptions,
    ) -> Self {
        Self {
            geolocator,
            updater,
            context,
            journal,
            interval: Duration::from_millis(config.interval_ms.max(1)),
            watch_options,
            current: Arc::new(RwLock::new(None)),
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Open the position watch and start the reporting loop.
    ///
    /// Requires foreground location permission. No-op when already started.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.watch.is_some() {
            return Ok(());
        }

        if !self.geolocator.request_foreground_permission().await? {
            self.journal.error("Permission to access location was denied");
            return Err(Error::PermissionDenied(
                "foreground location access is required",
            ));
        }

        let (samples_tx, mut samples_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let watch = self
            .geolocator
            .watch_position(&self.watch_options, samples_tx)
            .await?;

        let current = Arc::clone(&self.current);
        let sampler = tokio::spawn(async move {
            while let Some(sample) = samples_rx.recv().await {
                *current.write().expect("sample lock poisoned") = Some(sample);
            }
        });

        state.watch = Some(watch);
        state.sampler = Some(sampler);
        state.ticker = Some(self.spawn_ticker());

        tracing::info!("live location reporter started");
        Ok(())
    }

    /// Stop the loop, close the watch, and forget the latest sample.
    /// Safe to call when not started.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;

        if let Some(watch) = state.watch.take() {
            if let Err(e) = self.geolocator.clear_watch(watch).await {
                tracing::warn!(error = %e, "failed to clear position watch");
            }
        }
        if let Some(sampler) = state.sampler.take() {
            sampler.abort();
        }
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        *self.current.write().expect("sample lock poisoned") = None;

        tracing::info!("live location reporter stopped");
    }

    /// Latest position fix, if one has arrived since `start()`.
    pub fn latest_sample(&self) -> Option<LocationSample> {
        *self.current.read().expect("sample lock poisoned")
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let updater = self.updater.clone();
        let context = Arc::clone(&self.context);
        let current = Arc::clone(&self.current);
        let journal = self.journal.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the first
            // push happens one full interval after start
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(updater) = updater.as_deref() else {
                    continue;
                };
                let sample = *current.read().expect("sample lock poisoned");
                push_once(updater, &context, sample, &journal).await;
            }
        })
    }
}

/// One reporting tick: push the sample if the user is a driver and a
/// destination is known. Failures are journaled, never raised.
async fn push_once(
    updater: &dyn LocationUpdater,
    context: &AppContext,
    sample: Option<LocationSample>,
    journal: &Journal,
) {
    let Some(user) = context.user() else { return };
    if !user.is_driver() {
        return;
    }
    let Some(destination) = context.destination_location_id() else {
        return;
    };
    let Some(sample) = sample else { return };

    match updater
        .update_location(&destination, &LocationUpdate::from(sample))
        .await
    {
        Ok(_) => {
            tracing::debug!(
                destination = %destination,
                latitude = sample.latitude,
                longitude = sample.longitude,
                "pushed live location"
            );
        }
        Err(e) => {
            tracing::warn!(destination = %destination, error = %e, "failed to send location");
            journal.error(format!("Failed to send location: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LocationResource, Role, User};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn driver() -> User {
        User {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            role: Role::Driver,
            route: Some("route-7".to_string()),
            stop: None,
        }
    }

    fn student() -> User {
        User {
            role: Role::Student,
            ..driver()
        }
    }

    /// Counts updates; optionally fails every call.
    struct CountingUpdater {
        calls: AtomicUsize,
        last: StdMutex<Option<(String, LocationUpdate)>>,
        fail: bool,
    }

    impl CountingUpdater {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last: StdMutex::new(None),
                fail,
            }
        }
    }

    #[async_trait]
    impl LocationUpdater for CountingUpdater {
        async fn update_location(
            &self,
            id: &str,
            update: &LocationUpdate,
        ) -> crate::error::Result<LocationResource> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((id.to_string(), *update));
            if self.fail {
                return Err(Error::Api("connection refused".to_string()));
            }
            Ok(LocationResource {
                id: id.to_string(),
                latitude: update.latitude,
                longitude: update.longitude,
                user: None,
                address: None,
            })
        }
    }

    /// Geolocator double exposing the watch sample sender.
    #[derive(Default)]
    struct WatchingGeolocator {
        samples: StdMutex<Option<mpsc::Sender<LocationSample>>>,
        cleared: AtomicUsize,
    }

    #[async_trait]
    impl Geolocator for WatchingGeolocator {
        async fn request_foreground_permission(&self) -> crate::error::Result<bool> {
            Ok(true)
        }

        async fn request_background_permission(&self) -> crate::error::Result<bool> {
            Ok(true)
        }

        async fn define_task(
            &self,
            _: &str,
            _: mpsc::Sender<crate::platform::TaskEvent>,
        ) -> crate::error::Result<()> {
            Ok(())
        }

        async fn start_task(
            &self,
            _: &str,
            _: &LocationUpdateOptions,
        ) -> crate::error::Result<()> {
            Ok(())
        }

        async fn stop_task(&self, _: &str) -> crate::error::Result<()> {
            Ok(())
        }

        async fn task_started(&self, _: &str) -> crate::error::Result<bool> {
            Ok(false)
        }

        async fn watch_position(
            &self,
            _: &LocationUpdateOptions,
            samples: mpsc::Sender<LocationSample>,
        ) -> crate::error::Result<WatchId> {
            *self.samples.lock().unwrap() = Some(samples);
            Ok(WatchId(7))
        }

        async fn clear_watch(&self, _: WatchId) -> crate::error::Result<()> {
            self.cleared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn reporter_with(
        geolocator: Arc<WatchingGeolocator>,
        updater: Arc<CountingUpdater>,
        context: Arc<AppContext>,
        journal: Journal,
    ) -> LiveLocationReporter {
        let tracking = crate::config::TrackingConfig::default();
        LiveLocationReporter::new(
            geolocator as Arc<dyn Geolocator>,
            Some(updater as Arc<dyn LocationUpdater>),
            context,
            journal,
            &ReporterConfig { interval_ms: 5000 },
            LocationUpdateOptions::foreground_watch(&tracking),
        )
    }

    async fn feed_sample(geo: &WatchingGeolocator, sample: LocationSample) {
        let sender = geo.samples.lock().unwrap().clone().expect("watch open");
        sender.send(sample).await.unwrap();
        // Let the sampler task store it
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_push_once_requires_driver_and_destination() {
        let updater = CountingUpdater::new(false);
        let journal = Journal::default();
        let sample = Some(LocationSample::new(12.9, 77.5));

        // No user at all
        let context = AppContext::new();
        push_once(&updater, &context, sample, &journal).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 0);

        // Student with a destination
        context.set_user(Some(student()));
        context.set_destination_location_id(Some("loc123".to_string()));
        push_once(&updater, &context, sample, &journal).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 0);

        // Driver without a destination
        context.set_user(Some(driver()));
        context.set_destination_location_id(None);
        push_once(&updater, &context, sample, &journal).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 0);

        // Driver with destination but no sample yet
        context.set_destination_location_id(Some("loc123".to_string()));
        push_once(&updater, &context, None, &journal).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 0);

        // Everything present
        push_once(&updater, &context, sample, &journal).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 1);
        let (id, update) = updater.last.lock().unwrap().clone().unwrap();
        assert_eq!(id, "loc123");
        assert_eq!(update.latitude, 12.9);
        assert_eq!(update.longitude, 77.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_pushes_once_per_interval_without_dedup() {
        let geo = Arc::new(WatchingGeolocator::default());
        let updater = Arc::new(CountingUpdater::new(false));
        let context = Arc::new(AppContext::new());
        context.set_user(Some(driver()));
        context.set_destination_location_id(Some("loc123".to_string()));

        let reporter = reporter_with(
            Arc::clone(&geo),
            Arc::clone(&updater),
            context,
            Journal::default(),
        );
        reporter.start().await.unwrap();
        feed_sample(&geo, LocationSample::new(12.9, 77.5)).await;

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 1);

        // Sample unchanged: the next tick reissues the identical update
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(updater.calls.load(Ordering::SeqCst), 2);
        let (id, update) = updater.last.lock().unwrap().clone().unwrap();
        assert_eq!(id, "loc123");
        assert_eq!(update.latitude, 12.9);

        reporter.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_push_does_not_stop_the_loop() {
        let geo = Arc::new(WatchingGeolocator::default());
        let updater = Arc::new(CountingUpdater::new(true));
        let context = Arc::new(AppContext::new());
        context.set_user(Some(driver()));
        context.set_destination_location_id(Some("loc123".to_string()));
        let journal = Journal::default();

        let reporter = reporter_with(
            Arc::clone(&geo),
            Arc::clone(&updater),
            context,
            journal.clone(),
        );
        reporter.start().await.unwrap();
        feed_sample(&geo, LocationSample::new(1.0, 2.0)).await;

        tokio::time::sleep(Duration::from_millis(10100)).await;
        assert!(updater.calls.load(Ordering::SeqCst) >= 2);
        assert!(journal
            .snapshot()
            .iter()
            .any(|e| e.message.contains("Failed to send location")));

        reporter.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_watch_and_sample() {
        let geo = Arc::new(WatchingGeolocator::default());
        let updater = Arc::new(CountingUpdater::new(false));
        let reporter = reporter_with(
            Arc::clone(&geo),
            updater,
            Arc::new(AppContext::new()),
            Journal::default(),
        );

        reporter.start().await.unwrap();
        feed_sample(&geo, LocationSample::new(3.0, 4.0)).await;
        assert!(reporter.latest_sample().is_some());

        reporter.stop().await;
        assert!(reporter.latest_sample().is_none());
        assert_eq!(geo.cleared.load(Ordering::SeqCst), 1);

        // Stop again: no second clear
        reporter.stop().await;
        assert_eq!(geo.cleared.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let geo = Arc::new(WatchingGeolocator::default());
        let updater = Arc::new(CountingUpdater::new(false));
        let reporter = reporter_with(
            Arc::clone(&geo),
            updater,
            Arc::new(AppContext::new()),
            Journal::default(),
        );

        reporter.start().await.unwrap();
        let first = geo.samples.lock().unwrap().clone();
        reporter.start().await.unwrap();
        // Second start must not have reopened the watch
        assert!(first.is_some());
        assert_eq!(geo.cleared.load(Ordering::SeqCst), 0);

        reporter.stop().await;
    }
}
