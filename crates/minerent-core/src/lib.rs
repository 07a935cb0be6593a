//! # Minerent Core
//!
//! Market-data layer for the minerent cloud-mining marketplace.
//!
//! ## Overview
//!
//! The marketplace shows BTC price, network hashrate and mining difficulty on
//! every dashboard and uses them to estimate rental earnings. Those numbers
//! come from free third-party APIs that time out, throttle, and change shape.
//! This crate turns them into values that are always available:
//!
//! - **Ordered fallback** across providers (Coinbase → Binance → CoinGecko for price)
//! - **Circuit breaker** per provider with timed half-open probing
//! - **TTL cache** shared by every caller (10 minutes by default)
//! - **Static fallbacks** when nothing else is available
//! - **Profit calculator** over the resulting network stats
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream provider adapters |
//! | [`cache`] | TTL cache for metric values |
//! | [`circuit_breaker`] | Per-source circuit breaker |
//! | [`config`] | Service and profit configuration |
//! | [`data_source`] | Source traits, breaker-guarded fetch, source errors |
//! | [`domain`] | Metric types and fallback constants |
//! | [`error`] | Configuration errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`profitability`] | Earnings estimates |
//! | [`service`] | The aggregating [`MarketDataService`] |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use minerent_core::{MarketDataConfig, MarketDataService, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MarketDataConfig::from_env()?;
//!     let service = Arc::new(MarketDataService::from_config(
//!         config,
//!         Arc::new(ReqwestHttpClient::new()),
//!     ));
//!
//!     let stats = service.get_network_stats().await;
//!     println!("BTC ${:.2}, {:.0} TH/s", stats.btc_price, stats.network_hashrate_th);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  HTTP handler / CLI  │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │  MarketDataService   │────▶│   MetricCache    │
//! └──────────┬───────────┘     └──────────────────┘
//!            │ priority order
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │  GuardedSource<U>    │────▶│ Circuit Breaker  │
//! └──────────┬───────────┘     └──────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │  Upstream adapter    │────▶│   HttpClient     │
//! └──────────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Metric queries never fail. Upstream failures are [`SourceError`]s that
//! only drive the fallback chain and the breakers; callers always receive a
//! fresh, cached, or fallback value.

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod profitability;
pub mod service;

pub use adapters::{
    BinanceAdapter, BlockchainInfoAdapter, CoinbaseAdapter, CoingeckoAdapter, MempoolAdapter,
};

pub use cache::MetricCache;

pub use circuit_breaker::{
    BreakerConfig, BreakerStatus, CallPermit, CircuitBreaker, CircuitState,
};

pub use config::{MarketDataConfig, ProfitConfig};

pub use data_source::{
    FetchFuture, GuardedSource, MetricSource, SourceError, SourceErrorKind, SourceId, Upstream,
};

pub use domain::{
    Difficulty, Metric, NetworkStats, FALLBACK_BTC_PRICE, FALLBACK_DIFFICULTY,
    FALLBACK_NETWORK_HASHRATE_TH,
};

pub use error::ConfigError;

pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

pub use profitability::{EarningsEstimate, ProfitCalculator};

pub use service::{MarketDataService, MarketDataServiceBuilder, SharedSource};
