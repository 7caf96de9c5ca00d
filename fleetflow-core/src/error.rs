//! Error types for fleetflow-core

use thiserror::Error;

/// Main error type for the fleetflow-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A required location permission was denied by the user or the OS
    #[error("location permission denied: {0}")]
    PermissionDenied(&'static str),

    /// A platform service (geolocation, task runner) is not available
    #[error("platform service unavailable: {0}")]
    PlatformUnavailable(String),

    /// Scheduling or dismissing a notification failed
    #[error("notification error: {0}")]
    Notification(String),

    /// Remote API call failed (network or server-side)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for fleetflow-core
pub type Result<T> = std::result::Result<T, Error>;
