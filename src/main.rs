//! Marjani daemon
//!
//! Loads the configuration, opens the brush, then runs the command, drive and
//! schedule threads until Ctrl-C.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use marjani::config::MarjaniConfig;
use marjani::control::CleaningControl;
use marjani::devices::create_device;
use marjani::error::{MarjaniError, Result};
use marjani::protocol::StatusOutbox;
use marjani::shared::SharedState;
use marjani::threads::spawn_threads;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "/etc/marjani.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `marjani <path>` (positional)
/// - `marjani --config <path>` (flag-based)
/// - `marjani -c <path>` (short flag)
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn load_config() -> Result<MarjaniConfig> {
    match parse_config_path() {
        Some(path) => MarjaniConfig::load(Path::new(&path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            MarjaniConfig::load(Path::new(DEFAULT_CONFIG_PATH))
        }
        None => Ok(MarjaniConfig::default()),
    }
}

fn main() -> Result<()> {
    let config = load_config()?;

    let directive = format!("marjani={}", config.logging.level)
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|e| MarjaniError::Config(format!("Invalid log level: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    info!("Marjani v{}", env!("CARGO_PKG_VERSION"));
    info!("Device: {:?}, serial {}", config.device.kind, config.serial.port);

    let factory = create_device(&config)?;

    let shared_state = Arc::new(SharedState::new());
    let outbox = Arc::new(StatusOutbox::new());
    let control = Arc::new(CleaningControl::new(Arc::clone(&shared_state), outbox));

    match factory.open_brush() {
        Ok(brush) => control.attach_brush(brush),
        Err(e) => error!("Failed to open brush motor: {}", e),
    }

    let signal_state = Arc::clone(&shared_state);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal_state.signal_shutdown();
    })
    .map_err(|e| MarjaniError::Device(format!("Error setting Ctrl-C handler: {}", e)))?;

    let handles = spawn_threads(config, factory, Arc::clone(&control))?;

    // A thread that exits early does not take the others down
    let check_interval = Duration::from_millis(500);
    let mut reported = Vec::new();
    while !shared_state.should_shutdown() {
        std::thread::sleep(check_interval);
        for name in handles.finished() {
            if !reported.contains(&name) {
                warn!("{} thread exited", name);
                reported.push(name);
            }
        }
    }

    info!("Waiting for threads to finish...");
    handles.join();
    control.shutdown();

    info!("Marjani stopped");
    Ok(())
}
