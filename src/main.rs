//! Outbound latency observatory daemon.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                   OBSERVATORY                     │
//!                 │                                                   │
//!   config.toml ──┼─▶ registry ──▶ scheduler ──▶ prober ──────────────┼──▶ candidates
//!                 │                    │          (tcp / http)        │   (outbounds)
//!                 │                    ▼                              │
//!                 │               classifier                          │
//!                 │                    │ TableUpdate                  │
//!                 │                    ▼                              │
//!                 │   publisher ──▶ ranking table (ArcSwap snapshot)  │
//!                 │                    │                              │
//!                 │                    ▼                              │
//!   routing ◀─────┼──────────────── selector ──▶ drain tracker        │
//!                 │                                                   │
//!   admin API ◀───┼── ranking queries      metrics ──▶ Prometheus     │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use observatory::admin::serve_admin;
use observatory::config::load_config;
use observatory::config::watcher::ConfigWatcher;
use observatory::lifecycle::shutdown_signal;
use observatory::observability::{logging, metrics};
use observatory::Observatory;

#[derive(Parser)]
#[command(name = "observatory")]
#[command(about = "Probe outbound candidates and rank them by latency", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "observatory.toml")]
    config: PathBuf,

    /// Reload the candidate set when the config file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(config = %args.config.display(), "observatory v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let admin = config.admin.clone();
    let observatory = Observatory::start(config)?;

    if admin.enabled {
        let listener = TcpListener::bind(&admin.bind_address).await?;
        let obs = observatory.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_admin(obs, listener).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    // Keep the watcher alive until shutdown.
    let _watcher = if args.watch {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config, observatory.config());
        let handle = watcher.run()?;
        let obs = observatory.clone();
        tokio::spawn(async move {
            while let Some(candidates) = updates.recv().await {
                if let Err(e) = obs.reconcile(&candidates) {
                    tracing::error!(error = %e, "Failed to apply reloaded candidate set");
                }
            }
        });
        Some(handle)
    } else {
        None
    };

    shutdown_signal().await;
    let forced = observatory.stop().await;

    tracing::info!(force_closed = forced, "Shutdown complete");
    Ok(())
}
