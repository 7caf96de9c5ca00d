//! Configuration loading and management
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fleetflow/config.toml`
//! (~/.config/fleetflow/config.toml).
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/fleetflow/`
//! - State/Logs: `$XDG_STATE_HOME/fleetflow/`

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Fleet backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Background tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Live location reporter configuration
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// In-app journal configuration
    #[serde(default)]
    pub journal: JournalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fleet backend API configuration
///
/// The reporter only runs when this section is ready: pushing positions
/// without a backend to push to is meaningless, and the rest of the tracking
/// flow works fine without it.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the Location resource,
    /// e.g. `https://fleet.example.com/api/v1/location`
    pub base_url: Option<String>,

    /// Bearer token for authenticated calls
    pub token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    /// Check if the API is configured well enough to build a client
    pub fn is_ready(&self) -> bool {
        self.base_url.is_some()
    }

    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_none() {
            return Err(Error::Config("api.base_url is required".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_api_timeout() -> u64 {
    30
}

/// Background tracking configuration
///
/// Field defaults follow the platform options the mobile client passes to
/// the OS location service: highest navigation accuracy, 1 s / 1 m update
/// granularity, a visible indicator, and no automatic pausing.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Name the background task is registered under
    #[serde(default = "default_task_name")]
    pub task_name: String,

    /// Minimum interval between location updates, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Minimum distance between location updates, in meters
    #[serde(default = "default_min_distance_m")]
    pub min_distance_m: f64,

    /// Show the OS background-location indicator
    #[serde(default = "default_true")]
    pub show_indicator: bool,

    /// Let the OS pause updates automatically (defeats continuous tracking;
    /// off by default)
    #[serde(default)]
    pub allow_auto_pause: bool,

    /// Foreground-service notification title
    #[serde(default = "default_service_title")]
    pub service_title: String,

    /// Foreground-service notification body
    #[serde(default = "default_service_body")]
    pub service_body: String,

    /// Foreground-service notification accent color (hex)
    #[serde(default = "default_service_color")]
    pub service_color: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            task_name: default_task_name(),
            min_interval_ms: default_min_interval_ms(),
            min_distance_m: default_min_distance_m(),
            show_indicator: true,
            allow_auto_pause: false,
            service_title: default_service_title(),
            service_body: default_service_body(),
            service_color: default_service_color(),
        }
    }
}

fn default_task_name() -> String {
    "background-location-task".to_string()
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_min_distance_m() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_service_title() -> String {
    "Fleet Flow Tracking".to_string()
}

fn default_service_body() -> String {
    "Your location is being tracked in the background.".to_string()
}

fn default_service_color() -> String {
    "#1E88E5".to_string()
}

/// Live location reporter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReporterConfig {
    /// Interval between position pushes, in milliseconds
    #[serde(default = "default_report_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_report_interval_ms(),
        }
    }
}

fn default_report_interval_ms() -> u64 {
    5000
}

/// In-app journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    /// Maximum number of retained entries (oldest dropped first)
    #[serde(default = "default_journal_capacity")]
    pub capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            capacity: default_journal_capacity(),
        }
    }
}

fn default_journal_capacity() -> usize {
    crate::journal::DEFAULT_CAPACITY
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("fleetflow").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("fleetflow")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("fleetflow.log")
    }
}
