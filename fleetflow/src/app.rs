//! Application state for the TUI.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::runtime::Runtime;

use fleetflow_core::journal::JournalEntry;
use fleetflow_core::reporter::LiveLocationReporter;
use fleetflow_core::types::LocationSample;
use fleetflow_core::{Journal, TrackingController};

use crate::sim::SimPlatform;

/// Main application state.
///
/// The TUI event loop is synchronous; every interaction with the async core
/// is a short `block_on` against the shared runtime.
pub struct App {
    controller: TrackingController,
    reporter: Arc<LiveLocationReporter>,
    platform: Arc<SimPlatform>,
    journal: Journal,
    pub should_quit: bool,
    /// Snapshot of tracking state, refreshed once per frame
    pub tracking: bool,
    /// Latest foreground fix, refreshed once per frame
    pub latest: Option<LocationSample>,
    /// Journal snapshot, refreshed once per frame
    pub entries: Vec<JournalEntry>,
}

impl App {
    pub fn new(
        controller: TrackingController,
        reporter: Arc<LiveLocationReporter>,
        platform: Arc<SimPlatform>,
        journal: Journal,
    ) -> Self {
        Self {
            controller,
            reporter,
            platform,
            journal,
            should_quit: false,
            tracking: false,
            latest: None,
            entries: Vec::new(),
        }
    }

    /// Pull fresh state from the core before rendering a frame.
    pub fn refresh(&mut self, runtime: &Runtime) {
        self.tracking = runtime.block_on(self.controller.is_tracking());
        self.latest = self.reporter.latest_sample();
        self.entries = self.journal.snapshot();
    }

    pub fn handle_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('s') => {
                if self.tracking {
                    runtime.block_on(self.controller.stop());
                } else if let Err(e) = runtime.block_on(self.controller.start()) {
                    tracing::warn!(error = %e, "failed to start tracking");
                }
            }
            KeyCode::Char('x') => {
                // Simulate the user tapping Cancel on the OS notification
                runtime.block_on(self.platform.tap_cancel());
            }
            KeyCode::Char('c') => {
                self.journal.clear();
            }
            _ => {}
        }
    }
}
