//! Tracking session orchestration
//!
//! `TrackingController` is the single entry point for toggling a tracking
//! session. A session is Idle or Tracking, nothing in between: `start()`
//! settles with the background task enabled and the notification presented
//! (or deliberately skipped), `stop()` settles with both torn down.
//!
//! Transitions are serialized by holding the session lock for the whole
//! operation; a `stop()` issued during a pending `start()` queues behind it
//! and runs immediately after it settles. There is no mid-flight
//! cancellation.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::background::BackgroundLocationTask;
use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::notify::{CancelActionSubscription, NotificationBridge, NotificationRequest};
use crate::permissions::PermissionGate;
use crate::platform::LocationUpdateOptions;
use crate::types::AppLifecycle;

#[derive(Debug, Default)]
struct Session {
    active: bool,
}

/// Orchestrates permission checks, the background task, and the tracking
/// notification behind one start/stop toggle.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct TrackingController {
    permissions: Arc<PermissionGate>,
    task: Arc<BackgroundLocationTask>,
    notifications: Arc<NotificationBridge>,
    journal: Journal,
    config: Arc<TrackingConfig>,
    session: Arc<Mutex<Session>>,
}

impl TrackingController {
    pub fn new(
        permissions: Arc<PermissionGate>,
        task: Arc<BackgroundLocationTask>,
        notifications: Arc<NotificationBridge>,
        journal: Journal,
        config: TrackingConfig,
    ) -> Self {
        Self {
            permissions,
            task,
            notifications,
            journal,
            config: Arc::new(config),
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Register the background task definition with the platform.
    ///
    /// Safe to call repeatedly; intended to run once at app startup so the
    /// task exists before the OS ever tries to deliver to it.
    pub async fn init(&self) -> Result<()> {
        self.task.register(&self.config.task_name).await
    }

    /// Start a tracking session.
    ///
    /// Refused with [`Error::PermissionDenied`] unless both location
    /// permissions are granted. Platform failures are journaled before being
    /// returned. Notification scheduling failure is non-fatal: tracking
    /// proceeds without the notification. No-op when already tracking.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.active {
            return Ok(());
        }

        let summary = self.permissions.check().await;
        if !summary.granted() {
            self.journal
                .error("Location permissions denied; tracking not started");
            return Err(Error::PermissionDenied(
                "foreground and background location access is required",
            ));
        }

        if let Err(e) = self.task.register(&self.config.task_name).await {
            self.journal
                .error(format!("Error starting location updates: {e}"));
            return Err(e);
        }
        let options = LocationUpdateOptions::from_config(&self.config);
        if let Err(e) = self.task.enable(&self.config.task_name, &options).await {
            self.journal
                .error(format!("Error starting location updates: {e}"));
            return Err(e);
        }

        match self
            .notifications
            .schedule(&NotificationRequest::location_sharing())
            .await
        {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "tracking notification unavailable");
                self.journal
                    .warning(format!("Tracking notification unavailable: {e}"));
            }
        }

        session.active = true;
        self.journal.success("Location tracking started");
        tracing::info!("tracking session started");
        Ok(())
    }

    /// Stop the tracking session.
    ///
    /// Idempotent. Disable and dismiss are both no-op safe, so a forced stop
    /// while already idle still leaves the platform quiesced without error.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;

        if let Err(e) = self.task.disable(&self.config.task_name).await {
            tracing::warn!(error = %e, "failed to disable background task");
            self.journal
                .error(format!("Error stopping location updates: {e}"));
        }
        self.notifications.cancel().await;

        if session.active {
            self.journal.info("Location tracking stopped");
            tracing::info!("tracking session stopped");
        }
        session.active = false;
    }

    /// Whether a tracking session is active.
    pub async fn is_tracking(&self) -> bool {
        self.session.lock().await.active
    }

    /// App lifecycle hook.
    ///
    /// `Inactive` (about to terminate) forces a stop. `Background` is
    /// deliberately ignored: moving to the background is exactly when the
    /// background task earns its keep.
    pub async fn handle_lifecycle(&self, state: AppLifecycle) {
        match state {
            AppLifecycle::Inactive => {
                tracing::info!("app going inactive; stopping tracking");
                self.stop().await;
            }
            AppLifecycle::Background => {
                tracing::debug!("app backgrounded; tracking unaffected");
            }
            AppLifecycle::Active => {}
        }
    }

    /// Wire the notification's Cancel button to `stop()`.
    ///
    /// Returns a listener that detaches when dropped. A cancel tap runs the
    /// full stop transition, not just a notification dismissal.
    pub async fn bind_cancel_action(&self) -> Result<CancelListener> {
        let (cancel_tx, mut cancel_rx) = mpsc::channel(4);
        let subscription = self.notifications.watch_cancel_action(cancel_tx).await?;

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            while cancel_rx.recv().await.is_some() {
                controller
                    .journal
                    .info("Tracking cancelled from notification");
                controller.stop().await;
            }
        });

        Ok(CancelListener {
            _subscription: subscription,
            handle,
        })
    }
}

/// Owned wiring from the notification Cancel button to the controller;
/// dropping it detaches the listener.
pub struct CancelListener {
    _subscription: CancelActionSubscription,
    handle: JoinHandle<()>,
}

impl Drop for CancelListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
