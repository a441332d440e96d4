//! GyroGate - gamepad motion-to-input mapping engine
//!
//! Maps gyro, stick, button and touchpad input to virtual controller,
//! keyboard and mouse outputs through layered YAML mappings.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gyrogate::cli::{self, ReplCommand};
use gyrogate::config::{ensure_default_config, ConfigsWatcher};
use gyrogate::device::gilrs_provider;
use gyrogate::mapping::FocusContext;
use gyrogate::runtime::{AutoloadTable, Runtime};
use parking_lot::Mutex;

/// GyroGate - map gamepad motion to mouse, keyboard and virtual pad outputs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding mapping YAML files (defaults to the per-user dir)
    #[arg(short, long)]
    configs: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Tick loop frequency in Hz
    #[arg(long, default_value = "1000")]
    poll_rate: u32,

    /// List connected gamepads and exit
    #[arg(long)]
    list_devices: bool,

    /// Write the default Xbox mapping into the configs directory and exit
    #[arg(long)]
    write_default: bool,

    /// Start the interactive REPL
    #[arg(long)]
    repl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    let configs_dir = args
        .configs
        .clone()
        .unwrap_or_else(gyrogate::paths::configs_dir);
    info!("Starting GyroGate...");
    info!("Configs directory: {}", configs_dir.display());

    if args.list_devices {
        let devices = gilrs_provider::list_devices()?;
        if devices.is_empty() {
            println!("no gamepads connected");
        }
        for (id, name) in devices {
            println!("  [{id}] {name}");
        }
        return Ok(());
    }

    if args.write_default {
        let path = ensure_default_config(&configs_dir).await?;
        println!("default mapping at {}", path.display());
        return Ok(());
    }

    // Device events from the gilrs polling thread.
    let (device_tx, device_rx) = mpsc::unbounded_channel();
    let _gilrs_thread = gilrs_provider::spawn(device_tx)?;

    // Focus updates come from an external collaborator; without one the
    // channel just never changes and autoload runs on config changes only.
    let (_focus_tx, focus_rx) = watch::channel(FocusContext::default());

    let (repl_tx, repl_rx) = mpsc::unbounded_channel::<ReplCommand>();
    if args.repl {
        let tx = repl_tx.clone();
        let _repl_thread = std::thread::Builder::new()
            .name("repl".into())
            .spawn(move || {
                if let Err(e) = cli::run_repl(tx) {
                    warn!("REPL terminated: {e:#}");
                }
            })?;
    }

    let watcher = match ConfigsWatcher::new(&configs_dir) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("configs watcher unavailable, hot-reload disabled: {e:#}");
            None
        }
    };

    let autoload = Arc::new(Mutex::new(AutoloadTable::new(configs_dir)));
    let runtime = Runtime::new(
        args.poll_rate,
        autoload,
        device_rx,
        repl_rx,
        focus_rx,
        watcher,
    );
    runtime.run().await?;

    info!("GyroGate shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
