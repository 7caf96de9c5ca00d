//! Background location task management
//!
//! Wraps the platform task registry with the guards the raw surface lacks:
//! registration is idempotent per task name, enable is a no-op when the task
//! is already delivering updates, and disable is safe to call when it is not.
//!
//! Each registered task gets a pump: a tokio task draining the platform event
//! channel, journaling batches and forwarding platform errors as journal
//! entries. Nothing thrown by the platform ever crosses back into a caller's
//! stack.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::journal::Journal;
use crate::platform::{Geolocator, LocationUpdateOptions, TaskEvent};

/// Capacity of the platform-to-pump event channel. Batches beyond this while
/// the pump is behind apply backpressure on the platform side.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Registers and toggles the OS background location task.
pub struct BackgroundLocationTask {
    geolocator: Arc<dyn Geolocator>,
    journal: Journal,
    /// Pump handles keyed by task name; presence means "registered"
    pumps: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl BackgroundLocationTask {
    pub fn new(geolocator: Arc<dyn Geolocator>, journal: Journal) -> Self {
        Self {
            geolocator,
            journal,
            pumps: Mutex::new(HashMap::new()),
        }
    }

    /// Define the named task with the platform and start its event pump.
    ///
    /// Idempotent: re-registering an already-registered name is a no-op, so
    /// the platform never ends up with duplicate definitions.
    pub async fn register(&self, task_name: &str) -> Result<()> {
        let mut pumps = self.pumps.lock().await;
        if pumps.contains_key(task_name) {
            return Ok(());
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.geolocator.define_task(task_name, events_tx).await?;

        let pump = tokio::spawn(pump_events(
            task_name.to_string(),
            events_rx,
            self.journal.clone(),
        ));
        pumps.insert(task_name.to_string(), pump);

        tracing::debug!(task = %task_name, "background task registered");
        Ok(())
    }

    /// Start location updates for the named task.
    ///
    /// No-op when the task is already enabled (prevents duplicate
    /// subscriptions on double-start).
    pub async fn enable(&self, task_name: &str, options: &LocationUpdateOptions) -> Result<()> {
        if self.geolocator.task_started(task_name).await? {
            tracing::debug!(task = %task_name, "background task already enabled");
            return Ok(());
        }

        self.geolocator.start_task(task_name, options).await?;
        tracing::info!(task = %task_name, "background location updates enabled");
        Ok(())
    }

    /// Stop location updates for the named task. Safe to call when the task
    /// is not enabled.
    pub async fn disable(&self, task_name: &str) -> Result<()> {
        if !self.geolocator.task_started(task_name).await.unwrap_or(false) {
            return Ok(());
        }

        self.geolocator.stop_task(task_name).await?;
        tracing::info!(task = %task_name, "background location updates disabled");
        Ok(())
    }

    /// Whether the named task is currently delivering updates. Platform
    /// failures read as "not enabled".
    pub async fn is_enabled(&self, task_name: &str) -> bool {
        self.geolocator.task_started(task_name).await.unwrap_or(false)
    }
}

impl Drop for BackgroundLocationTask {
    fn drop(&mut self) {
        // Pumps hold a Journal clone; abort them so they don't outlive the
        // task registry that spawned them.
        if let Ok(pumps) = self.pumps.try_lock() {
            for pump in pumps.values() {
                pump.abort();
            }
        }
    }
}

/// Drain platform events for one task until the platform drops its sender.
async fn pump_events(task_name: String, mut events: mpsc::Receiver<TaskEvent>, journal: Journal) {
    while let Some(event) = events.recv().await {
        match event {
            TaskEvent::Batch(samples) => {
                if let Some(sample) = samples.last() {
                    tracing::debug!(
                        task = %task_name,
                        count = samples.len(),
                        latitude = sample.latitude,
                        longitude = sample.longitude,
                        "background location batch"
                    );
                    journal.info(format!(
                        "Background location: {:.5}, {:.5}",
                        sample.latitude, sample.longitude
                    ));
                }
            }
            TaskEvent::Error(message) => {
                tracing::warn!(task = %task_name, error = %message, "background location error");
                journal.error(format!("Background location error: {message}"));
            }
        }
    }
    tracing::debug!(task = %task_name, "background event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::platform::WatchId;
    use crate::types::LocationSample;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Fake task registry tracking definitions and the started flag.
    #[derive(Default)]
    struct FakeTaskRunner {
        definitions: AtomicUsize,
        starts: AtomicUsize,
        stops: AtomicUsize,
        started: AtomicBool,
        events: StdMutex<Option<mpsc::Sender<TaskEvent>>>,
    }

    #[async_trait]
    impl Geolocator for FakeTaskRunner {
        async fn request_foreground_permission(&self) -> Result<bool> {
            Ok(true)
        }

        async fn request_background_permission(&self) -> Result<bool> {
            Ok(true)
        }

        async fn define_task(&self, _: &str, events: mpsc::Sender<TaskEvent>) -> Result<()> {
            self.definitions.fetch_add(1, Ordering::SeqCst);
            *self.events.lock().unwrap() = Some(events);
            Ok(())
        }

        async fn start_task(&self, _: &str, _: &LocationUpdateOptions) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop_task(&self, task_name: &str) -> Result<()> {
            if !self.started.swap(false, Ordering::SeqCst) {
                return Err(Error::PlatformUnavailable(format!(
                    "task {task_name} not started"
                )));
            }
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn task_started(&self, _: &str) -> Result<bool> {
            Ok(self.started.load(Ordering::SeqCst))
        }

        async fn watch_position(
            &self,
            _: &LocationUpdateOptions,
            _: mpsc::Sender<LocationSample>,
        ) -> Result<WatchId> {
            Ok(WatchId(0))
        }

        async fn clear_watch(&self, _: WatchId) -> Result<()> {
            Ok(())
        }
    }

    fn options() -> LocationUpdateOptions {
        LocationUpdateOptions::from_config(&crate::config::TrackingConfig::default())
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let runner = Arc::new(FakeTaskRunner::default());
        let task = BackgroundLocationTask::new(
            Arc::clone(&runner) as Arc<dyn Geolocator>,
            Journal::default(),
        );

        task.register("t").await.unwrap();
        task.register("t").await.unwrap();
        task.register("t").await.unwrap();

        assert_eq!(runner.definitions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enable_skips_when_already_started() {
        let runner = Arc::new(FakeTaskRunner::default());
        let task = BackgroundLocationTask::new(
            Arc::clone(&runner) as Arc<dyn Geolocator>,
            Journal::default(),
        );

        task.enable("t", &options()).await.unwrap();
        task.enable("t", &options()).await.unwrap();

        assert_eq!(runner.starts.load(Ordering::SeqCst), 1);
        assert!(task.is_enabled("t").await);
    }

    #[tokio::test]
    async fn test_disable_is_noop_when_not_enabled() {
        let runner = Arc::new(FakeTaskRunner::default());
        let task = BackgroundLocationTask::new(
            Arc::clone(&runner) as Arc<dyn Geolocator>,
            Journal::default(),
        );

        // FakeTaskRunner::stop_task would error here; the guard prevents it
        task.disable("t").await.unwrap();
        assert_eq!(runner.stops.load(Ordering::SeqCst), 0);

        task.enable("t", &options()).await.unwrap();
        task.disable("t").await.unwrap();
        assert_eq!(runner.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batches_and_errors_reach_journal() {
        let runner = Arc::new(FakeTaskRunner::default());
        let journal = Journal::default();
        let task = BackgroundLocationTask::new(
            Arc::clone(&runner) as Arc<dyn Geolocator>,
            journal.clone(),
        );
        task.register("t").await.unwrap();

        let events = runner.events.lock().unwrap().clone().expect("sender");
        events
            .send(TaskEvent::Batch(vec![LocationSample::new(12.9, 77.5)]))
            .await
            .unwrap();
        events
            .send(TaskEvent::Error("task killed".to_string()))
            .await
            .unwrap();

        // Give the pump a chance to drain
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let entries = journal.snapshot();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].message.contains("12.9"));
        assert_eq!(entries[1].severity, crate::journal::Severity::Error);
        assert!(entries[1].message.contains("task killed"));
    }
}
