//! Location permission negotiation
//!
//! Foreground permission is requested first; background permission is only
//! requested after foreground is granted, since background access is useless
//! without it and the extra OS prompt would only confuse the user. Any denial
//! or platform failure collapses to "nothing granted" — permission problems
//! are reported, never raised.

use std::sync::Arc;

use crate::journal::Journal;
use crate::platform::Geolocator;

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSummary {
    pub foreground: bool,
    pub background: bool,
}

impl PermissionSummary {
    /// Both permissions granted; tracking may start.
    pub fn granted(&self) -> bool {
        self.foreground && self.background
    }

    fn denied() -> Self {
        Self::default()
    }
}

/// Requests and reports location permission state.
pub struct PermissionGate {
    geolocator: Arc<dyn Geolocator>,
    journal: Journal,
}

impl PermissionGate {
    pub fn new(geolocator: Arc<dyn Geolocator>, journal: Journal) -> Self {
        Self { geolocator, journal }
    }

    /// Request foreground and background location permission.
    ///
    /// Never fails: platform errors are logged and reported as a full denial.
    pub async fn check(&self) -> PermissionSummary {
        match self.request_both().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "Permission request failed");
                self.journal
                    .error(format!("Error requesting location permissions: {e}"));
                PermissionSummary::denied()
            }
        }
    }

    async fn request_both(&self) -> crate::error::Result<PermissionSummary> {
        if !self.geolocator.request_foreground_permission().await? {
            self.journal
                .warning("Foreground location permission denied");
            return Ok(PermissionSummary::denied());
        }

        if !self.geolocator.request_background_permission().await? {
            self.journal
                .warning("Background location permission denied");
            return Ok(PermissionSummary::denied());
        }

        Ok(PermissionSummary {
            foreground: true,
            background: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::platform::{
        LocationUpdateOptions, TaskEvent, WatchId,
    };
    use crate::types::LocationSample;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Geolocator double that scripts permission answers and counts calls.
    struct ScriptedGeolocator {
        foreground: Result<bool>,
        background: Result<bool>,
        background_requests: AtomicUsize,
    }

    impl ScriptedGeolocator {
        fn new(foreground: Result<bool>, background: Result<bool>) -> Self {
            Self {
                foreground,
                background,
                background_requests: AtomicUsize::new(0),
            }
        }
    }

    fn clone_result(r: &Result<bool>) -> Result<bool> {
        match r {
            Ok(v) => Ok(*v),
            Err(Error::PlatformUnavailable(msg)) => Err(Error::PlatformUnavailable(msg.clone())),
            Err(_) => Err(Error::PlatformUnavailable("scripted".to_string())),
        }
    }

    #[async_trait]
    impl Geolocator for ScriptedGeolocator {
        async fn request_foreground_permission(&self) -> Result<bool> {
            clone_result(&self.foreground)
        }

        async fn request_background_permission(&self) -> Result<bool> {
            self.background_requests.fetch_add(1, Ordering::SeqCst);
            clone_result(&self.background)
        }

        async fn define_task(&self, _: &str, _: mpsc::Sender<TaskEvent>) -> Result<()> {
            Ok(())
        }

        async fn start_task(&self, _: &str, _: &LocationUpdateOptions) -> Result<()> {
            Ok(())
        }

        async fn stop_task(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn task_started(&self, _: &str) -> Result<bool> {
            Ok(false)
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

    #[tokio::test]
    async fn test_both_granted() {
        let geo = Arc::new(ScriptedGeolocator::new(Ok(true), Ok(true)));
        let gate = PermissionGate::new(geo, Journal::default());
        let summary = gate.check().await;
        assert!(summary.granted());
    }

    #[tokio::test]
    async fn test_foreground_denied_short_circuits() {
        let geo = Arc::new(ScriptedGeolocator::new(Ok(false), Ok(true)));
        let gate = PermissionGate::new(Arc::clone(&geo) as Arc<dyn Geolocator>, Journal::default());

        let summary = gate.check().await;
        assert_eq!(summary, PermissionSummary::denied());
        // Background permission must never have been requested
        assert_eq!(geo.background_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_background_denied_reports_full_denial() {
        let geo = Arc::new(ScriptedGeolocator::new(Ok(true), Ok(false)));
        let gate = PermissionGate::new(geo, Journal::default());
        let summary = gate.check().await;
        assert!(!summary.foreground);
        assert!(!summary.background);
    }

    #[tokio::test]
    async fn test_platform_error_is_absorbed_and_journaled() {
        let geo = Arc::new(ScriptedGeolocator::new(
            Err(Error::PlatformUnavailable("no location service".to_string())),
            Ok(true),
        ));
        let journal = Journal::default();
        let gate = PermissionGate::new(geo, journal.clone());

        let summary = gate.check().await;
        assert!(!summary.granted());
        let entries = journal.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, crate::journal::Severity::Error);
    }
}
