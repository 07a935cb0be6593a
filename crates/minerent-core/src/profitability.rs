//! Earnings estimates for rented hashrate.
//!
//! Pure functions of market data: the caller supplies network hashrate and
//! BTC price (normally from [`MarketDataService`](crate::MarketDataService)).
//! All hashrates are in TH/s.

use serde::{Deserialize, Serialize};

use crate::config::ProfitConfig;
use crate::domain::NetworkStats;

const DAYS_PER_MONTH: f64 = 30.0;

/// Net-of-fee earnings projection for one rental.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsEstimate {
    pub daily_btc: f64,
    pub monthly_btc: f64,
    pub total_btc: f64,
    pub total_usd: f64,
    pub maintenance_fee_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfitCalculator {
    config: ProfitConfig,
}

impl ProfitCalculator {
    pub const fn new(config: ProfitConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> ProfitConfig {
        self.config
    }

    /// Gross BTC mined per day by `user_th` out of `network_th`.
    pub fn daily_btc(&self, user_th: f64, network_th: f64) -> f64 {
        if network_th == 0.0 {
            return 0.0;
        }
        let share = user_th / network_th;
        share * f64::from(self.config.blocks_per_day) * self.config.block_reward_btc
    }

    pub fn monthly_profit_usd(&self, user_th: f64, network_th: f64, btc_price_usd: f64) -> f64 {
        let monthly_btc = self.daily_btc(user_th, network_th) * DAYS_PER_MONTH;
        self.net_of_fee(monthly_btc) * btc_price_usd
    }

    /// Whole days until net earnings cover `investment_usd`; `0` when nothing is earned.
    ///
    /// The ratio is floored into a `u64`, so a negative investment or a
    /// negative price also yields `0` rather than a negative day count.
    pub fn roi_days(
        &self,
        investment_usd: f64,
        user_th: f64,
        network_th: f64,
        btc_price_usd: f64,
    ) -> u64 {
        let daily_btc = self.daily_btc(user_th, network_th);
        if daily_btc == 0.0 {
            return 0;
        }
        let daily_profit_usd = self.net_of_fee(daily_btc) * btc_price_usd;
        if daily_profit_usd == 0.0 {
            return 0;
        }
        // Saturating float-to-int cast: negative investments clamp to 0.
        (investment_usd / daily_profit_usd) as u64
    }

    pub fn estimate_earnings(
        &self,
        user_th: f64,
        duration_days: u32,
        network_th: f64,
        btc_price_usd: f64,
    ) -> EarningsEstimate {
        let daily_btc = self.net_of_fee(self.daily_btc(user_th, network_th));
        let total_btc = daily_btc * f64::from(duration_days);
        EarningsEstimate {
            daily_btc,
            monthly_btc: daily_btc * DAYS_PER_MONTH,
            total_btc,
            total_usd: total_btc * btc_price_usd,
            maintenance_fee_percent: self.config.maintenance_fee_percent,
        }
    }

    /// [`estimate_earnings`](Self::estimate_earnings) against a live stats snapshot.
    pub fn estimate_from_stats(
        &self,
        user_th: f64,
        duration_days: u32,
        stats: &NetworkStats,
    ) -> EarningsEstimate {
        self.estimate_earnings(
            user_th,
            duration_days,
            stats.network_hashrate_th,
            stats.btc_price,
        )
    }

    fn net_of_fee(&self, btc: f64) -> f64 {
        btc * (1.0 - self.config.fee_fraction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn calculator() -> ProfitCalculator {
        ProfitCalculator::default()
    }

    #[test]
    fn daily_btc_is_share_of_block_rewards() {
        let daily = calculator().daily_btc(100.0, 500_000_000.0);
        assert!(daily > 0.0);
        assert!((daily - 100.0 / 500_000_000.0 * 144.0 * 3.125).abs() < 1e-15);
    }

    #[test]
    fn zero_network_hashrate_earns_nothing() {
        assert_eq!(calculator().daily_btc(100.0, 0.0), 0.0);
    }

    #[test]
    fn monthly_profit_applies_fee() {
        let calculator = calculator();
        let gross = calculator.daily_btc(100.0, 500_000_000.0) * 30.0 * 50_000.0;
        let net = calculator.monthly_profit_usd(100.0, 500_000_000.0, 50_000.0);

        assert!(net > 0.0);
        assert!((net - gross * 0.95).abs() < 1e-9);
    }

    #[test]
    fn roi_days_truncates_and_handles_zero_output() {
        let calculator = calculator();
        // 1000 TH/s of a 1_000_000 TH/s network: 0.45 BTC/day gross, 0.4275 net.
        let days = calculator.roi_days(10_000.0, 1_000.0, 1_000_000.0, 1_000.0);
        assert_eq!(days, 23);

        assert!(calculator.roi_days(1000.0, 100.0, 500_000_000.0, 50_000.0) > 0);
        assert_eq!(calculator.roi_days(1000.0, 0.0, 500_000_000.0, 50_000.0), 0);
        assert_eq!(calculator.roi_days(1000.0, 100.0, 500_000_000.0, 0.0), 0);
        assert_eq!(calculator.roi_days(-1000.0, 1_000.0, 1_000_000.0, 1_000.0), 0);
    }

    #[test]
    fn estimate_reports_net_figures() {
        let stats = NetworkStats {
            btc_price: 50_000.0,
            network_hashrate_th: 500_000_000.0,
            difficulty: Difficulty::FALLBACK,
        };
        let estimate = calculator().estimate_from_stats(100.0, 30, &stats);

        assert!(estimate.total_usd > 0.0);
        assert_eq!(estimate.maintenance_fee_percent, 5.0);
        assert!((estimate.monthly_btc - estimate.total_btc).abs() < 1e-18);
        assert!((estimate.total_usd - estimate.total_btc * 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn custom_fee_changes_net_output() {
        let free = ProfitCalculator::new(ProfitConfig {
            maintenance_fee_percent: 0.0,
            ..ProfitConfig::default()
        });
        let gross = free.daily_btc(100.0, 1_000.0);
        let estimate = free.estimate_earnings(100.0, 1, 1_000.0, 1.0);

        assert_eq!(estimate.daily_btc, gross);
        assert_eq!(free.config().maintenance_fee_percent, 0.0);
    }
}
