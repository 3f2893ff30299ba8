//! Pacer demo binary.
//!
//! Reads lines from stdin and echoes the ones that pass the throttle to
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # At most one line per 500ms, latest line wins after each window
//! tail -f chat.log | pacer --interval-ms 500
//!
//! # Leading edge only, throttled lines are discarded
//! tail -f chat.log | pacer --interval-ms 500 --drop-trailing
//! ```

use std::{io::Write, time::Duration};

use clap::Parser;
use pacer_runtime::{DEFAULT_WORKER_LABEL, SystemEnv, Throttler, ThrottlerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How often to check for a trailing line once stdin is closed.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Throttle lines read from stdin
#[derive(Parser, Debug)]
#[command(name = "pacer")]
#[command(about = "Rate-limit lines from stdin")]
#[command(version)]
struct Args {
    /// Minimum spacing between echoed lines, in milliseconds
    #[arg(short, long, default_value = "1000")]
    interval_ms: u64,

    /// Discard throttled lines instead of echoing the latest after the window
    #[arg(long)]
    drop_trailing: bool,

    /// Worker label used in log events
    #[arg(long, default_value = DEFAULT_WORKER_LABEL)]
    label: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ThrottlerConfig::with_interval(Duration::from_millis(args.interval_ms))
        .broadcast_latest(!args.drop_trailing)
        .label(args.label);
    let throttler = Throttler::spawn(SystemEnv::new(), &config)?;

    tracing::info!(
        interval = ?config.interval,
        broadcast_latest = config.broadcast_latest,
        "pacer starting"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        throttler.execute(move || {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}") {
                tracing::warn!("Failed to write line: {}", e);
            }
        });
    }

    while throttler.has_pending() {
        tokio::time::sleep(DRAIN_POLL).await;
    }

    tracing::info!("stdin closed, exiting");
    Ok(())
}
