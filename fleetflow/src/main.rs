//! fleetflow - live fleet location tracking client
//!
//! Terminal front-end driving the tracking core against a simulated device
//! platform: grant-everything permissions, a random-walk GPS, in-memory
//! notifications. The journal screen shows what the core is doing.

mod app;
mod sim;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;

use fleetflow_core::api::{ApiClient, LocationUpdater};
use fleetflow_core::background::BackgroundLocationTask;
use fleetflow_core::notify::NotificationBridge;
use fleetflow_core::permissions::PermissionGate;
use fleetflow_core::platform::{Geolocator, LocationUpdateOptions, NotificationCenter};
use fleetflow_core::reporter::LiveLocationReporter;
use fleetflow_core::types::{AppContext, AppLifecycle, Role, User};
use fleetflow_core::{Config, Journal, TrackingController};

use crate::app::App;
use crate::sim::SimPlatform;

/// Route the simulated driver is signed in under.
const SIM_ROUTE: &str = "sim-route";

#[derive(Parser)]
#[command(name = "fleetflow", version, about = "Live fleet location tracking client")]
struct Args {
    /// Path to an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard = fleetflow_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("fleetflow starting up");

    let runtime = Runtime::new().context("failed to start async runtime")?;

    let journal = Journal::new(config.journal.capacity);
    let platform = Arc::new(SimPlatform::new(config.tracking.min_interval_ms));

    // Wire the tracking core against the simulated platform
    let permissions = Arc::new(PermissionGate::new(
        Arc::clone(&platform) as Arc<dyn Geolocator>,
        journal.clone(),
    ));
    let task = Arc::new(BackgroundLocationTask::new(
        Arc::clone(&platform) as Arc<dyn Geolocator>,
        journal.clone(),
    ));
    let notifications = Arc::new(NotificationBridge::new(
        Arc::clone(&platform) as Arc<dyn NotificationCenter>,
        journal.clone(),
    ));
    let controller = TrackingController::new(
        permissions,
        task,
        notifications,
        journal.clone(),
        config.tracking.clone(),
    );

    runtime
        .block_on(controller.init())
        .context("failed to register background task")?;
    let _cancel_listener = runtime
        .block_on(controller.bind_cancel_action())
        .context("failed to attach cancel listener")?;

    // Simulated sign-in: the demo always runs as a driver on SIM_ROUTE
    let context = Arc::new(AppContext::new());
    context.set_user(Some(User {
        id: "sim-driver".to_string(),
        name: "Sim Driver".to_string(),
        role: Role::Driver,
        route: Some(SIM_ROUTE.to_string()),
        stop: None,
    }));

    // Live pushes only when a backend is configured
    let updater: Option<Arc<dyn LocationUpdater>> = if config.api.is_ready() {
        let client = Arc::new(
            ApiClient::from_config(&config.api).context("failed to create API client")?,
        );
        match runtime.block_on(client.get_location_from_route(SIM_ROUTE)) {
            Ok(location) => context.set_destination_location_id(Some(location.id)),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve route location");
                journal.warning(format!("Could not resolve route location: {e}"));
            }
        }
        Some(client)
    } else {
        journal.info("API not configured; live location pushes disabled");
        None
    };

    let reporter = Arc::new(LiveLocationReporter::new(
        Arc::clone(&platform) as Arc<dyn Geolocator>,
        updater,
        Arc::clone(&context),
        journal.clone(),
        &config.reporter,
        LocationUpdateOptions::foreground_watch(&config.tracking),
    ));
    runtime
        .block_on(reporter.start())
        .context("failed to start live location reporter")?;

    let mut app = App::new(
        controller.clone(),
        Arc::clone(&reporter),
        Arc::clone(&platform),
        journal,
    );

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, &runtime);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    // The shell is going away: same teardown the mobile host would run
    runtime.block_on(controller.handle_lifecycle(AppLifecycle::Inactive));
    runtime.block_on(reporter.stop());

    tracing::info!("fleetflow shutting down");

    result
}

/// Run the main application loop.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &Runtime,
) -> Result<()> {
    loop {
        app.refresh(runtime);
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key, runtime);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
