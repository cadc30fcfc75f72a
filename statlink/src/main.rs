//! # StatLink Daemon
//!
//! Streams hardware telemetry to an embedded display client over UDP.
//!
//! Startup sequence: load and validate the JSON config, put a startup
//! grace packet on the wire, run sensor discovery (shared memory, then
//! the hwmon query provider, then the REST tree endpoint), attach the
//! source stack and enter the poll/emit loop. `--discover` stops after
//! discovery and dumps the catalog.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use statlink::discovery::{self, Discovery};
use statlink::emitter::TelemetryEmitter;
use statlink::poller::Poller;
use statlink::sources::MetricSource;
use statlink_common::consts::DEFAULT_CONFIG_PATH;
use statlink_common::prelude::{MonitorConfig, SourceTag};
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// StatLink: hardware telemetry to UDP display clients
#[derive(Parser, Debug)]
#[command(name = "statlink")]
#[command(version)]
#[command(about = "Sensor acquisition and UDP telemetry daemon")]
struct Args {
    /// Path to the monitor configuration JSON.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the display client host from the config.
    #[arg(long)]
    host: Option<String>,

    /// Override the display client UDP port from the config.
    #[arg(long)]
    port: Option<u16>,

    /// Override the poll interval in seconds.
    #[arg(long)]
    interval: Option<f64>,

    /// Run discovery, print the sensor catalog and exit.
    #[arg(long)]
    discover: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("StatLink v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("StatLink shutdown complete");
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = MonitorConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.udp_port = port;
    }
    if let Some(interval) = args.interval {
        config.update_interval_s = interval;
    }
    config.validate()?;
    info!(
        destination = %format!("{}:{}", config.host, config.udp_port),
        interval_s = config.update_interval_s,
        metrics = config.metrics.len(),
        "config loaded"
    );

    if args.discover {
        print_catalog(&discovery::discover(&config).await);
        return Ok(());
    }

    let emitter = TelemetryEmitter::bind(&config.host, config.udp_port).await?;
    let mut poller = Poller::new_starting(MetricSource::new(&config), config.metrics.clone());

    // First packet goes out as SourceStarting while discovery runs.
    let report = poller.tick().await;
    emitter.send(&report.packet).await;

    let found = discovery::discover(&config).await;
    let source_available = found.source_available && poller.attach_source().await;
    poller.mark_started(source_available);

    let (stop_tx, stop_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(poller.run(config.interval(), emitter, stop_rx, None));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = stop_tx.send(true);
    loop_handle.await?;

    Ok(())
}

/// Dump the discovered catalog in a fixed-width table.
fn print_catalog(found: &Discovery) {
    println!(
        "source: {} ({} sensors)",
        found.source.label(),
        found.entries.len()
    );
    println!(
        "{:<10} {:<12} {:<6} {:>10}  {}",
        "NAME", "CATEGORY", "UNIT", "VALUE", "LABEL"
    );
    for entry in &found.entries {
        println!(
            "{:<10} {:<12} {:<6} {:>10.1}  {} [{}]",
            entry.short_name,
            entry.category.to_string(),
            entry.unit,
            entry.value,
            entry.label,
            entry.device,
        );
    }
    if found.source == SourceTag::System {
        println!("note: no external sensor source found; system metrics only");
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
