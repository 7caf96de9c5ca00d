//! # fleetflow-core
//!
//! Core library for fleetflow - a live fleet/transit tracking client.
//!
//! This library provides:
//! - The tracking session state machine (start/stop toggle, lifecycle hooks)
//! - Platform trait seams for geolocation, background tasks, and notifications
//! - A foreground reporter pushing driver positions to the fleet backend
//! - The in-app event journal, configuration, and logging infrastructure
//!
//! ## Architecture
//!
//! [`controller::TrackingController`] is the only writer of tracking state.
//! It composes three narrower components, each fronting one OS service:
//! [`permissions::PermissionGate`], [`background::BackgroundLocationTask`],
//! and [`notify::NotificationBridge`]. The [`reporter::LiveLocationReporter`]
//! runs beside them while the UI is in the foreground and pushes the latest
//! position over [`api::ApiClient`].
//!
//! Platform callbacks arrive as messages on `tokio` channels (see
//! [`platform`]), so nothing the OS does executes on an application call
//! stack.

// Re-export commonly used items at the crate root
pub use config::Config;
pub use controller::TrackingController;
pub use error::{Error, Result};
pub use journal::{Journal, JournalEntry, Severity};
pub use types::*;

// Public modules
pub mod api;
pub mod background;
pub mod config;
pub mod controller;
pub mod error;
pub mod journal;
pub mod logging;
pub mod notify;
pub mod permissions;
pub mod platform;
pub mod reporter;
pub mod types;
