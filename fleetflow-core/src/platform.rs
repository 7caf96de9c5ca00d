//! Platform service seams
//!
//! The tracking flow touches three OS services: geolocation, the background
//! task runner, and the notification center. This module defines the trait
//! boundary in front of them so the core can run against the real mobile
//! bindings, a desktop simulator, or test doubles.
//!
//! Platform callbacks do not map onto a Rust call stack: the OS invokes them
//! from its own execution context, at times the application does not control,
//! and swallows anything that escapes them. Every callback surface here is
//! therefore a `tokio::sync::mpsc` sender handed to the platform at
//! registration time; the platform pushes events into the channel and the
//! application drains them in its own tasks. Errors travel inside the channel
//! as values, never across the task boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::TrackingConfig;
use crate::error::Result;
use crate::types::LocationSample;

/// Identifier of the cancel button attached to the tracking notification.
pub const CANCEL_ACTION_ID: &str = "cancel-action";

// ============================================
// Geolocation
// ============================================

/// Requested fix accuracy, from coarse to navigation-grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    Balanced,
    High,
    BestForNavigation,
}

/// Foreground-service notification shown while background updates run
/// (required by some platforms for continued background location access).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundService {
    pub title: String,
    pub body: String,
    /// Accent color, hex string
    pub color: String,
}

/// Options passed to the location service when subscribing to updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdateOptions {
    pub accuracy: Accuracy,
    /// Minimum interval between fixes, milliseconds
    pub min_interval_ms: u64,
    /// Minimum distance between fixes, meters
    pub min_distance_m: f64,
    /// Show the OS background-location indicator
    pub show_indicator: bool,
    /// Let the OS pause updates automatically
    pub allow_auto_pause: bool,
    pub foreground_service: Option<ForegroundService>,
}

impl LocationUpdateOptions {
    /// Background-task options derived from the tracking config.
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            accuracy: Accuracy::BestForNavigation,
            min_interval_ms: config.min_interval_ms,
            min_distance_m: config.min_distance_m,
            show_indicator: config.show_indicator,
            allow_auto_pause: config.allow_auto_pause,
            foreground_service: Some(ForegroundService {
                title: config.service_title.clone(),
                body: config.service_body.clone(),
                color: config.service_color.clone(),
            }),
        }
    }

    /// Foreground watch options: same fix granularity, no service
    /// notification (the watch dies with the foreground UI anyway).
    pub fn foreground_watch(config: &TrackingConfig) -> Self {
        Self {
            foreground_service: None,
            ..Self::from_config(config)
        }
    }
}

/// Events the platform delivers on a background task's channel.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A batch of position fixes
    Batch(Vec<LocationSample>),
    /// Task-level failure reported by the OS (e.g. the task was killed)
    Error(String),
}

/// Handle to an open foreground position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// The OS geolocation + background task runner surface.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Request foreground location permission; `Ok(true)` means granted.
    /// May show a one-time OS dialog.
    async fn request_foreground_permission(&self) -> Result<bool>;

    /// Request background location permission; `Ok(true)` means granted.
    async fn request_background_permission(&self) -> Result<bool>;

    /// Define (or silently overwrite) the named background task. Events for
    /// the task flow into `events` once the task is started.
    async fn define_task(&self, task_name: &str, events: mpsc::Sender<TaskEvent>) -> Result<()>;

    /// Start delivering location updates to the named task.
    async fn start_task(&self, task_name: &str, options: &LocationUpdateOptions) -> Result<()>;

    /// Stop the named task. Errors when the task is not running; callers
    /// wanting no-op semantics check [`Geolocator::task_started`] first.
    async fn stop_task(&self, task_name: &str) -> Result<()>;

    /// Whether the named task is currently delivering updates.
    async fn task_started(&self, task_name: &str) -> Result<bool>;

    /// Open a foreground position watch; samples flow into `samples` until
    /// the watch is cleared.
    async fn watch_position(
        &self,
        options: &LocationUpdateOptions,
        samples: mpsc::Sender<LocationSample>,
    ) -> Result<WatchId>;

    /// Close a previously opened position watch.
    async fn clear_watch(&self, watch: WatchId) -> Result<()>;
}

// ============================================
// Notifications
// ============================================

/// Content of a presented notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Category the notification is presented under (determines its actions)
    pub category: String,
}

/// An action button attached to a notification category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    /// Render as a destructive action; never brings the app to foreground
    pub destructive: bool,
}

/// Handle to a presented notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationId(pub String);

impl NotificationId {
    /// Fresh random handle; used by platform implementations.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A user interaction with a presented notification.
#[derive(Debug, Clone)]
pub struct NotificationResponse {
    pub notification: NotificationId,
    /// Identifier of the tapped action
    pub action_id: String,
}

/// The OS notification center surface.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    /// Whether the user has granted notification permission.
    async fn permission_granted(&self) -> bool;

    /// Register (or replace) a category and its action buttons.
    async fn set_category(&self, category: &str, actions: Vec<NotificationAction>) -> Result<()>;

    /// Present a notification immediately, returning its handle.
    async fn present(&self, content: &NotificationContent) -> Result<NotificationId>;

    /// Dismiss a presented notification.
    async fn dismiss(&self, id: &NotificationId) -> Result<()>;

    /// Subscribe to action taps. Responses flow into `responses` from the
    /// platform execution context for the lifetime of the center.
    async fn subscribe_responses(&self, responses: mpsc::Sender<NotificationResponse>)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;

    #[test]
    fn test_options_from_config() {
        let config = TrackingConfig::default();
        let options = LocationUpdateOptions::from_config(&config);
        assert_eq!(options.accuracy, Accuracy::BestForNavigation);
        assert_eq!(options.min_interval_ms, 1000);
        assert!(options.show_indicator);
        assert!(!options.allow_auto_pause);
        let service = options.foreground_service.expect("service notification");
        assert_eq!(service.title, "Fleet Flow Tracking");
    }

    #[test]
    fn test_foreground_watch_has_no_service_notification() {
        let config = TrackingConfig::default();
        let options = LocationUpdateOptions::foreground_watch(&config);
        assert!(options.foreground_service.is_none());
        assert_eq!(options.min_distance_m, 1.0);
    }

    #[test]
    fn test_notification_ids_are_unique() {
        assert_ne!(NotificationId::random(), NotificationId::random());
    }
}
