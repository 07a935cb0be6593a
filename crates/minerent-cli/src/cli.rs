//! CLI argument definitions for minerent.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stats` | BTC price, network hashrate and difficulty |
//! | `price` | BTC price in USD |
//! | `hashrate` | Network hashrate in TH/s |
//! | `difficulty` | Mining difficulty and next adjustment |
//! | `breakers` | Circuit breaker state per upstream source |
//! | `estimate` | Earnings estimate for rented hashrate |
//!
//! # Examples
//!
//! ```bash
//! minerent stats --pretty
//! minerent breakers --probe
//! minerent stats --offline
//! minerent estimate --hashrate-th 100 --days 30 --investment-usd 1500
//! ```

use clap::{Args, Parser, Subcommand};

/// Market data and earnings estimates for the minerent marketplace.
#[derive(Debug, Parser)]
#[command(
    name = "minerent",
    author,
    version,
    about = "Market data and earnings estimates for the minerent marketplace"
)]
pub struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Upstream request timeout in milliseconds (overrides MINERENT_REQUEST_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Never contact upstreams; serve static fallback values.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch all three network metrics.
    Stats,
    /// Fetch the BTC price in USD.
    Price,
    /// Fetch the network hashrate in TH/s.
    Hashrate,
    /// Fetch the mining difficulty and its projected adjustment.
    Difficulty,
    /// Show circuit breaker state per upstream source.
    Breakers(BreakersArgs),
    /// Estimate earnings for rented hashrate against live network stats.
    Estimate(EstimateArgs),
}

#[derive(Debug, Args)]
pub struct BreakersArgs {
    /// Query every metric first so the breakers reflect current upstream health.
    #[arg(long, default_value_t = false)]
    pub probe: bool,
}

#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Rented hashrate in TH/s.
    #[arg(long)]
    pub hashrate_th: f64,

    /// Rental duration in days.
    #[arg(long, default_value_t = 30)]
    pub days: u32,

    /// Up-front cost in USD; adds ROI days to the output.
    #[arg(long)]
    pub investment_usd: Option<f64>,
}
