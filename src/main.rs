use anyhow::Result;
use clap::Parser;

use arbscan::app::{self, AppCfg};
use arbscan::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Solana DEX arbitrage scanner with multi-venue quote rotation")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// Probe amount in native units of the input token
    #[arg(long)]
    probe_amount: Option<u64>,

    /// Slippage tolerance in basis points
    #[arg(long)]
    slippage_bps: Option<u32>,

    /// Recurring scan interval in seconds
    #[arg(long)]
    scan_interval_secs: Option<u64>,

    /// Minimum spread percentage override for the session settings
    #[arg(long)]
    min_spread: Option<f64>,

    /// Venue allow-list, comma-separated (jupiter,raydium,orca)
    #[arg(long)]
    venues: Option<String>,

    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter.clone())
        .init();

    // Priority: CLI args > config file > defaults
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(probe_amount) = args.probe_amount {
        config.scan.probe_amount = probe_amount;
    }
    if let Some(slippage_bps) = args.slippage_bps {
        config.scan.slippage_bps = slippage_bps;
    }
    if let Some(secs) = args.scan_interval_secs {
        config.scan.scan_interval_ms = secs * 1_000;
    }

    let venues = args
        .venues
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect());

    app::run(AppCfg {
        config,
        min_spread_percentage: args.min_spread,
        venues,
    })
    .await
}
