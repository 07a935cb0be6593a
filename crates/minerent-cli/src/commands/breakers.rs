use minerent_core::MarketDataService;
use serde_json::Value;

use crate::cli::BreakersArgs;
use crate::error::CliError;

pub async fn run(args: &BreakersArgs, service: &MarketDataService) -> Result<Value, CliError> {
    if args.probe {
        let _ = service.get_network_stats().await;
    }
    Ok(serde_json::to_value(service.get_circuit_breaker_status())?)
}
