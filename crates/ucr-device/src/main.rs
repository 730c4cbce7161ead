//! UCR device entry point.
//!
//! ```text
//! main()
//!  └─ command_from_env()   -- run, or --write-default-config and exit
//!  └─ load_config_from()   -- TOML file, defaults when absent
//!  └─ UdpTransport::bind() -- non-blocking socket on the configured port
//!  └─ build_engine()       -- engine + registered channels
//!  └─ run_tick_loop()      -- tick at a fixed cadence until Ctrl-C
//! ```
//!
//! Set `RUST_LOG` to override the configured log level, e.g.
//! `RUST_LOG=ucr_core=trace` prints every document on the wire.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ucr_device::application::configure_engine::build_engine;
use ucr_device::application::run_device::run_tick_loop;
use ucr_device::infrastructure::network::UdpTransport;
use ucr_device::infrastructure::storage::config::{
    command_from_env, load_config_from, save_config_to, Command, DeviceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = match command_from_env() {
        Command::Run(path) => path,
        Command::WriteDefaultConfig(path) => {
            save_config_to(&path, &DeviceConfig::default())
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote default config to {}", path.display());
            return Ok(());
        }
    };
    let config = load_config_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.device.log_level)),
        )
        .init();

    info!(config = %config_path.display(), "UCR device starting");
    if config.channels.is_empty() {
        warn!("no channels configured; the device will only answer heartbeats");
    }

    let addr = config.network.socket_addr()?;
    let transport = UdpTransport::bind(addr)?;
    let mut engine = build_engine(transport, &config)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => {
                warn!("failed to listen for Ctrl-C, running until killed: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    run_tick_loop(&mut engine, config.timing.tick_interval(), shutdown).await;

    info!("UCR device stopped");
    Ok(())
}
