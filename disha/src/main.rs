//! Disha - obstacle-avoidance daemon
//!
//! Loads the configuration, brings up the configured device and runs the
//! navigation loop until Ctrl-C or SIGTERM.

use disha::devices::create_device;
use disha::{CancelToken, Config, Error, NavigationLoop, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG: &str = "disha.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `disha <path>` (positional)
/// - `disha --config <path>` (flag-based)
/// - `disha -c <path>` (short flag)
///
/// Falls back to `./disha.toml` when it exists, built-in defaults otherwise.
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

    Path::new(DEFAULT_CONFIG)
        .exists()
        .then(|| DEFAULT_CONFIG.to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Disha v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match parse_config_path() {
        Some(path) => {
            log::info!("Using config: {}", path);
            Config::load(&path)?
        }
        None => {
            log::info!("No config file, using defaults");
            Config::default()
        }
    };

    log::info!(
        "Device: {} ({})",
        config.device.name,
        config.device.device_type
    );

    let hardware = create_device(&config.device)?;

    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        token.cancel();
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let stats = NavigationLoop::new(hardware, &config, cancel).run()?;
    log::info!(
        "Disha stopped after {} readings and {} obstacles",
        stats.cycles,
        stats.obstacles
    );
    Ok(())
}
