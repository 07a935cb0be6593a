use minerent_core::{
    EarningsEstimate, MarketDataService, NetworkStats, ProfitCalculator, ProfitConfig,
};
use serde::Serialize;
use serde_json::Value;

use crate::cli::EstimateArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct EstimateResponse {
    hashrate_th: f64,
    duration_days: u32,
    network: NetworkStats,
    monthly_profit_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    roi_days: Option<u64>,
    earnings: EarningsEstimate,
}

pub async fn run(args: &EstimateArgs, service: &MarketDataService) -> Result<Value, CliError> {
    validate(args)?;

    let calculator = ProfitCalculator::new(ProfitConfig::from_env()?);
    let network = service.get_network_stats().await;

    let response = EstimateResponse {
        hashrate_th: args.hashrate_th,
        duration_days: args.days,
        network,
        monthly_profit_usd: calculator.monthly_profit_usd(
            args.hashrate_th,
            network.network_hashrate_th,
            network.btc_price,
        ),
        roi_days: args.investment_usd.map(|investment| {
            calculator.roi_days(
                investment,
                args.hashrate_th,
                network.network_hashrate_th,
                network.btc_price,
            )
        }),
        earnings: calculator.estimate_from_stats(args.hashrate_th, args.days, &network),
    };

    Ok(serde_json::to_value(response)?)
}

fn validate(args: &EstimateArgs) -> Result<(), CliError> {
    if !args.hashrate_th.is_finite() || args.hashrate_th <= 0.0 {
        return Err(CliError::InvalidArgument(String::from(
            "--hashrate-th must be a positive number",
        )));
    }
    if let Some(investment) = args.investment_usd {
        if !investment.is_finite() || investment < 0.0 {
            return Err(CliError::InvalidArgument(String::from(
                "--investment-usd must be a non-negative number",
            )));
        }
    }
    Ok(())
}
