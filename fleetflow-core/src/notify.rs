//! Tracking notification management
//!
//! One persistent notification mirrors the tracking state. It carries a
//! single destructive Cancel button; tapping it dismisses the notification
//! and emits a cancel event the controller turns into a stop.
//!
//! The cancel listener is a single owned subscription per bridge: attached
//! once, held as an abort-on-drop handle, detached exactly once on teardown.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::platform::{
    NotificationAction, NotificationCenter, NotificationContent, NotificationId, CANCEL_ACTION_ID,
};

/// What to present for the active tracking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub category: String,
}

impl NotificationRequest {
    /// The live-location-sharing notification the controller presents.
    pub fn location_sharing() -> Self {
        Self {
            title: "Location Sharing".to_string(),
            body: "sharing of live location is active".to_string(),
            category: "location-sharing".to_string(),
        }
    }
}

/// Schedules and dismisses the tracking notification and owns the
/// cancel-action listener.
pub struct NotificationBridge {
    center: Arc<dyn NotificationCenter>,
    journal: Journal,
    /// Handle of the currently presented notification, if any; shared with
    /// the cancel listener task
    current: Arc<Mutex<Option<NotificationId>>>,
}

impl NotificationBridge {
    pub fn new(center: Arc<dyn NotificationCenter>, journal: Journal) -> Self {
        Self {
            center,
            journal,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Present the tracking notification.
    ///
    /// Requires granted notification permission; callers treat a failure
    /// here as non-fatal (tracking proceeds without the notification).
    pub async fn schedule(&self, request: &NotificationRequest) -> Result<NotificationId> {
        if !self.center.permission_granted().await {
            return Err(Error::Notification(
                "notification permission not granted".to_string(),
            ));
        }

        self.center
            .set_category(
                &request.category,
                vec![NotificationAction {
                    id: CANCEL_ACTION_ID.to_string(),
                    title: "Cancel".to_string(),
                    destructive: true,
                }],
            )
            .await?;

        let id = self
            .center
            .present(&NotificationContent {
                title: request.title.clone(),
                body: request.body.clone(),
                category: request.category.clone(),
            })
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;

        *self.current.lock().await = Some(id.clone());
        tracing::debug!(notification = %id.0, "tracking notification presented");
        Ok(id)
    }

    /// Dismiss the current notification. No-op when none is presented;
    /// dismissal failures are logged, not raised.
    pub async fn cancel(&self) {
        dismiss_current(self.center.as_ref(), &self.current, &self.journal).await;
    }

    /// Handle of the currently presented notification, if any.
    pub async fn current(&self) -> Option<NotificationId> {
        self.current.lock().await.clone()
    }

    /// Attach the cancel-action listener.
    ///
    /// On a cancel tap the bridge dismisses the current notification and
    /// emits `()` on `on_cancel`. The returned subscription detaches the
    /// listener when dropped.
    pub async fn watch_cancel_action(
        &self,
        on_cancel: mpsc::Sender<()>,
    ) -> Result<CancelActionSubscription> {
        let (responses_tx, mut responses_rx) = mpsc::channel(8);
        self.center.subscribe_responses(responses_tx).await?;

        let center = Arc::clone(&self.center);
        let current = Arc::clone(&self.current);
        let journal = self.journal.clone();
        let handle = tokio::spawn(async move {
            while let Some(response) = responses_rx.recv().await {
                if response.action_id != CANCEL_ACTION_ID {
                    continue;
                }
                dismiss_current(center.as_ref(), &current, &journal).await;
                if on_cancel.send(()).await.is_err() {
                    break;
                }
            }
        });

        Ok(CancelActionSubscription { handle })
    }
}

/// Take and dismiss the currently presented notification, if any. Dismissal
/// failures are logged, not raised.
async fn dismiss_current(
    center: &dyn NotificationCenter,
    current: &Mutex<Option<NotificationId>>,
    journal: &Journal,
) {
    let taken = current.lock().await.take();
    if let Some(id) = taken {
        if let Err(e) = center.dismiss(&id).await {
            tracing::warn!(notification = %id.0, error = %e, "failed to dismiss notification");
            journal.warning(format!("Failed to dismiss notification: {e}"));
        }
    }
}

/// Owned cancel-action subscription; dropping it detaches the listener.
pub struct CancelActionSubscription {
    handle: JoinHandle<()>,
}

impl Drop for CancelActionSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
