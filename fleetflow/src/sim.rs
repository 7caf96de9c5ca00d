//! Simulated device platform
//!
//! Stands in for the mobile OS services so the tracking core can run on a
//! desktop: every permission is granted, location fixes come from a
//! pseudo-random walk, and notifications live in memory. The cancel button
//! is "tapped" from the keyboard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fleetflow_core::error::{Error, Result};
use fleetflow_core::platform::{
    Geolocator, LocationUpdateOptions, NotificationAction, NotificationCenter,
    NotificationContent, NotificationId, NotificationResponse, TaskEvent, WatchId,
    CANCEL_ACTION_ID,
};
use fleetflow_core::types::LocationSample;

/// Starting point of the simulated walk (Bangalore city center).
const START_LATITUDE: f64 = 12.9716;
const START_LONGITUDE: f64 = 77.5946;

/// Maximum per-fix drift in degrees, roughly 50 m.
const MAX_STEP: f64 = 0.0005;

struct SimTask {
    events: mpsc::Sender<TaskEvent>,
    walker: Option<JoinHandle<()>>,
}

/// In-memory stand-in for the OS geolocation and notification services.
pub struct SimPlatform {
    /// Interval between simulated fixes
    interval: Duration,
    tasks: StdMutex<HashMap<String, SimTask>>,
    watches: StdMutex<HashMap<WatchId, JoinHandle<()>>>,
    next_watch: AtomicU64,
    presented: StdMutex<Vec<NotificationId>>,
    responses: StdMutex<Option<mpsc::Sender<NotificationResponse>>>,
}

impl SimPlatform {
    pub fn new(fix_interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(fix_interval_ms.max(100)),
            tasks: StdMutex::new(HashMap::new()),
            watches: StdMutex::new(HashMap::new()),
            next_watch: AtomicU64::new(0),
            presented: StdMutex::new(Vec::new()),
            responses: StdMutex::new(None),
        }
    }

    /// Deliver a Cancel tap on the most recently presented notification, as
    /// the OS would when the user hits the button.
    pub async fn tap_cancel(&self) {
        let notification = match self.presented.lock().expect("sim lock poisoned").last() {
            Some(id) => id.clone(),
            None => return,
        };
        let sender = self.responses.lock().expect("sim lock poisoned").clone();
        if let Some(sender) = sender {
            let _ = sender
                .send(NotificationResponse {
                    notification,
                    action_id: CANCEL_ACTION_ID.to_string(),
                })
                .await;
        }
    }
}

impl Drop for SimPlatform {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.lock() {
            for task in tasks.values() {
                if let Some(walker) = &task.walker {
                    walker.abort();
                }
            }
        }
        if let Ok(watches) = self.watches.lock() {
            for watch in watches.values() {
                watch.abort();
            }
        }
    }
}

/// Random-walk generator feeding a background task's event channel.
async fn walk_batches(events: mpsc::Sender<TaskEvent>, interval: Duration) {
    let mut latitude = START_LATITUDE;
    let mut longitude = START_LONGITUDE;
    loop {
        tokio::time::sleep(interval).await;
        let (dlat, dlon) = random_step();
        latitude += dlat;
        longitude += dlon;
        let batch = TaskEvent::Batch(vec![LocationSample::new(latitude, longitude)]);
        if events.send(batch).await.is_err() {
            break;
        }
    }
}

/// Random-walk generator feeding a foreground position watch.
async fn walk_samples(samples: mpsc::Sender<LocationSample>, interval: Duration) {
    let mut latitude = START_LATITUDE;
    let mut longitude = START_LONGITUDE;
    loop {
        tokio::time::sleep(interval).await;
        let (dlat, dlon) = random_step();
        latitude += dlat;
        longitude += dlon;
        if samples
            .send(LocationSample::new(latitude, longitude))
            .await
            .is_err()
        {
            break;
        }
    }
}

fn random_step() -> (f64, f64) {
    let mut rng = rand::thread_rng();
    (
        rng.gen_range(-MAX_STEP..MAX_STEP),
        rng.gen_range(-MAX_STEP..MAX_STEP),
    )
}

#[async_trait]
impl Geolocator for SimPlatform {
    async fn request_foreground_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn request_background_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn define_task(&self, task_name: &str, events: mpsc::Sender<TaskEvent>) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("sim lock poisoned");
        if let Some(existing) = tasks.get(task_name) {
            if let Some(walker) = &existing.walker {
                walker.abort();
            }
        }
        tasks.insert(
            task_name.to_string(),
            SimTask {
                events,
                walker: None,
            },
        );
        Ok(())
    }

    async fn start_task(&self, task_name: &str, _: &LocationUpdateOptions) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("sim lock poisoned");
        let task = tasks.get_mut(task_name).ok_or_else(|| {
            Error::PlatformUnavailable(format!("task {task_name} not defined"))
        })?;
        if task.walker.is_some() {
            return Err(Error::PlatformUnavailable(format!(
                "task {task_name} already started"
            )));
        }
        task.walker = Some(tokio::spawn(walk_batches(
            task.events.clone(),
            self.interval,
        )));
        Ok(())
    }

    async fn stop_task(&self, task_name: &str) -> Result<()> {
        let mut tasks = self.tasks.lock().expect("sim lock poisoned");
        let task = tasks.get_mut(task_name).ok_or_else(|| {
            Error::PlatformUnavailable(format!("task {task_name} not defined"))
        })?;
        match task.walker.take() {
            Some(walker) => {
                walker.abort();
                Ok(())
            }
            None => Err(Error::PlatformUnavailable(format!(
                "task {task_name} not started"
            ))),
        }
    }

    async fn task_started(&self, task_name: &str) -> Result<bool> {
        let tasks = self.tasks.lock().expect("sim lock poisoned");
        Ok(tasks
            .get(task_name)
            .is_some_and(|task| task.walker.is_some()))
    }

    async fn watch_position(
        &self,
        _: &LocationUpdateOptions,
        samples: mpsc::Sender<LocationSample>,
    ) -> Result<WatchId> {
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::SeqCst) + 1);
        let walker = tokio::spawn(walk_samples(samples, self.interval));
        self.watches
            .lock()
            .expect("sim lock poisoned")
            .insert(id, walker);
        Ok(id)
    }

    async fn clear_watch(&self, watch: WatchId) -> Result<()> {
        if let Some(walker) = self.watches.lock().expect("sim lock poisoned").remove(&watch) {
            walker.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationCenter for SimPlatform {
    async fn permission_granted(&self) -> bool {
        true
    }

    async fn set_category(&self, _: &str, _: Vec<NotificationAction>) -> Result<()> {
        Ok(())
    }

    async fn present(&self, content: &NotificationContent) -> Result<NotificationId> {
        let id = NotificationId::random();
        self.presented
            .lock()
            .expect("sim lock poisoned")
            .push(id.clone());
        tracing::debug!(title = %content.title, "simulated notification presented");
        Ok(id)
    }

    async fn dismiss(&self, id: &NotificationId) -> Result<()> {
        self.presented
            .lock()
            .expect("sim lock poisoned")
            .retain(|presented| presented != id);
        Ok(())
    }

    async fn subscribe_responses(
        &self,
        responses: mpsc::Sender<NotificationResponse>,
    ) -> Result<()> {
        *self.responses.lock().expect("sim lock poisoned") = Some(responses);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn task_delivers_batches_until_stopped() {
        let platform = SimPlatform::new(100);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        platform.define_task("t", events_tx).await.unwrap();
        assert!(!platform.task_started("t").await.unwrap());

        let options =
            LocationUpdateOptions::from_config(&fleetflow_core::config::TrackingConfig::default());
        platform.start_task("t", &options).await.unwrap();
        assert!(platform.task_started("t").await.unwrap());

        match events_rx.recv().await.expect("a batch") {
            TaskEvent::Batch(samples) => assert!(!samples.is_empty()),
            TaskEvent::Error(e) => panic!("unexpected error event: {e}"),
        }

        platform.stop_task("t").await.unwrap();
        assert!(!platform.task_started("t").await.unwrap());
        assert!(platform.stop_task("t").await.is_err());
    }

    #[tokio::test]
    async fn cancel_tap_reaches_subscriber() {
        let platform = SimPlatform::new(100);
        let (responses_tx, mut responses_rx) = mpsc::channel(8);
        platform.subscribe_responses(responses_tx).await.unwrap();

        let id = platform
            .present(&NotificationContent {
                title: "Location Sharing".to_string(),
                body: "body".to_string(),
                category: "location-sharing".to_string(),
            })
            .await
            .unwrap();

        platform.tap_cancel().await;
        let response = responses_rx.recv().await.expect("a response");
        assert_eq!(response.notification, id);
        assert_eq!(response.action_id, CANCEL_ACTION_ID);
    }
}
