mod breakers;
mod estimate;

use std::sync::Arc;

use minerent_core::{MarketDataConfig, MarketDataService, NoopHttpClient};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let service = build_service(cli)?;

    match &cli.command {
        Command::Stats => Ok(serde_json::to_value(service.get_network_stats().await)?),
        Command::Price => Ok(serde_json::json!({
            "btc_price": service.get_btc_price().await,
        })),
        Command::Hashrate => Ok(serde_json::json!({
            "network_hashrate_th": service.get_network_hashrate().await,
        })),
        Command::Difficulty => Ok(serde_json::to_value(
            service.get_mining_difficulty().await,
        )?),
        Command::Breakers(args) => breakers::run(args, &service).await,
        Command::Estimate(args) => estimate::run(args, &service).await,
    }
}

fn build_service(cli: &Cli) -> Result<MarketDataService, CliError> {
    let mut config = MarketDataConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        if timeout_ms == 0 {
            return Err(CliError::InvalidArgument(String::from(
                "--timeout-ms must be greater than zero",
            )));
        }
        config = config.with_request_timeout_ms(timeout_ms);
    }
    debug!(
        cache_ttl_secs = config.cache_ttl.as_secs(),
        timeout_ms = config.request_timeout_ms,
        user_agent = %config.user_agent,
        offline = cli.offline,
        "market data service configured"
    );

    if cli.offline {
        return Ok(MarketDataService::from_config(config, Arc::new(NoopHttpClient)));
    }
    Ok(MarketDataService::over_reqwest(config))
}
