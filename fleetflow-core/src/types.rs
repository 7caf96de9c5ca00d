//! Core domain types for fleetflow
//!
//! These mirror the resources the fleet backend serves (users, locations)
//! plus the in-process values the tracking flow passes between components
//! (position samples, lifecycle transitions, shared app context).

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Users
// ============================================

/// Role of the signed-in user.
///
/// Only drivers broadcast their position; students and admins are read-only
/// consumers of route/stop data and never feed the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Driver,
    Admin,
}

/// The signed-in user, as served by the auth backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Route assigned to the user, if any
    #[serde(default)]
    pub route: Option<String>,
    /// Stop assigned to the user, if any
    #[serde(default)]
    pub stop: Option<String>,
}

impl User {
    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

// ============================================
// Locations
// ============================================

/// A single device position fix.
///
/// Produced by the platform location service; never persisted. At most the
/// latest sample is retained in memory for the reporter's next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }
}

/// A Location resource on the fleet backend (one per driver/route).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResource {
    #[serde(rename = "_id")]
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// User owning this location
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Body of a position update sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<LocationSample> for LocationUpdate {
    fn from(sample: LocationSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
        }
    }
}

// ============================================
// Application lifecycle
// ============================================

/// Application lifecycle states as reported by the host shell.
///
/// `Background` keeps tracking alive (that is the point of the background
/// task); `Inactive` means the app is about to be torn down and tracking
/// must be stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Active,
    Background,
    Inactive,
}

// ============================================
// Shared app context
// ============================================

/// Reactive state the tracking flow reads but does not own: the signed-in
/// user and the backend Location resource the reporter writes to.
///
/// Constructed once by the host shell and passed by `Arc` to the components
/// that need it; there are no process-wide globals.
#[derive(Debug, Default)]
pub struct AppContext {
    user: RwLock<Option<User>>,
    destination_location_id: RwLock<Option<String>>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.write().expect("user lock poisoned") = user;
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().expect("user lock poisoned").clone()
    }

    pub fn set_destination_location_id(&self, id: Option<String>) {
        *self
            .destination_location_id
            .write()
            .expect("destination lock poisoned") = id;
    }

    pub fn destination_location_id(&self) -> Option<String> {
        self.destination_location_id
            .read()
            .expect("destination lock poisoned")
            .clone()
    }
}
