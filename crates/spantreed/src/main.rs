//! spantreed daemon entry point.
//!
//! Initializes logging, builds the controller, and runs the event loop
//! until a shutdown signal arrives. The switch connection layer and the
//! discovery service attach by cloning the event sender; without them
//! the controller idles with an always-unstable tree.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use spantreed::{
    event_channel, run_event_loop, ControllerConfig, ControllerEvent, InMemoryTransport,
    TreeController, UnstablePolicy,
};

/// Self-stabilizing spanning-tree SDN controller daemon.
#[derive(Debug, Parser)]
#[command(name = "spantreed", version, about)]
struct Args {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Policy for inter-switch ports while no stable tree exists.
    /// Overrides the configuration file.
    #[arg(long)]
    unstable_policy: Option<UnstablePolicy>,

    /// Log filter (overridden by RUST_LOG when set).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging.
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting spantreed ---");

    let mut config = match args.config.as_deref() {
        Some(path) => match ControllerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ControllerConfig::new(),
    };
    if let Some(policy) = args.unstable_policy {
        config = config.with_unstable_policy(policy);
    }
    info!(policy = %config.unstable_policy, "unstable-tree policy");

    // The real switch connection layer registers connections here and
    // feeds SwitchUp/SwitchDown/PacketIn through the event sender; the
    // discovery service feeds Link events the same way.
    let transport = Arc::new(InMemoryTransport::new());
    let controller = TreeController::new(config, transport);

    let (tx, rx) = event_channel();
    warn!("no discovery service attached; running with an always-unstable tree");

    let loop_handle = tokio::spawn(run_event_loop(controller, rx));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!("failed to listen for shutdown signal: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if tx.send(ControllerEvent::Shutdown).is_err() {
        error!("event loop stopped before shutdown");
        return ExitCode::FAILURE;
    }

    match loop_handle.await {
        Ok(controller) => {
            for line in controller.dump() {
                info!("{}", line);
            }
            info!("spantreed exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("controller task failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
