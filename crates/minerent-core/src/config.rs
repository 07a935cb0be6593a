//! Runtime configuration for the market-data service and profit estimates.
//!
//! Defaults match production. Every value can be overridden from the
//! environment:
//!
//! | Variable | Default | Applies to |
//! |----------|---------|------------|
//! | `MINERENT_CACHE_TTL_SECS` | `600` | metric cache freshness |
//! | `MINERENT_REQUEST_TIMEOUT_MS` | `10000` | every upstream request |
//! | `MINERENT_BREAKER_FAILURE_THRESHOLD` | `3` | all breakers |
//! | `MINERENT_BREAKER_RECOVERY_SECS` | `60` (`120` for coingecko) | all breakers |
//! | `MINERENT_USER_AGENT` | `minerent/<version>` | every upstream request |
//! | `MINERENT_MAINTENANCE_FEE_PERCENT` | `5.0` | profit estimates |

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::circuit_breaker::BreakerConfig;
use crate::data_source::SourceId;
use crate::error::ConfigError;
use crate::http_client::{DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};

pub const CACHE_TTL_ENV: &str = "MINERENT_CACHE_TTL_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "MINERENT_REQUEST_TIMEOUT_MS";
pub const FAILURE_THRESHOLD_ENV: &str = "MINERENT_BREAKER_FAILURE_THRESHOLD";
pub const RECOVERY_SECS_ENV: &str = "MINERENT_BREAKER_RECOVERY_SECS";
pub const USER_AGENT_ENV: &str = "MINERENT_USER_AGENT";
pub const MAINTENANCE_FEE_ENV: &str = "MINERENT_MAINTENANCE_FEE_PERCENT";

const SLOW_RECOVERY: Duration = Duration::from_secs(120);

/// Settings for [`MarketDataService`](crate::MarketDataService).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataConfig {
    pub cache_ttl: Duration,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    breakers: HashMap<SourceId, BreakerConfig>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        let breakers = SourceId::ALL
            .into_iter()
            .map(|id| (id, default_breaker(id)))
            .collect();
        Self {
            cache_ttl: DEFAULT_TTL,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: String::from(DEFAULT_USER_AGENT),
            breakers,
        }
    }
}

fn default_breaker(id: SourceId) -> BreakerConfig {
    match id {
        SourceId::Coingecko => BreakerConfig::default().with_recovery_timeout(SLOW_RECOVERY),
        _ => BreakerConfig::default(),
    }
}

impl MarketDataConfig {
    /// Defaults overridden by any `MINERENT_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = read_positive_u64(&lookup, CACHE_TTL_ENV)? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(timeout_ms) = read_positive_u64(&lookup, REQUEST_TIMEOUT_ENV)? {
            config.request_timeout_ms = timeout_ms;
        }
        if let Some(raw) = lookup(USER_AGENT_ENV) {
            let user_agent = raw.trim();
            if user_agent.is_empty() {
                return Err(ConfigError::Empty {
                    name: USER_AGENT_ENV,
                });
            }
            config.user_agent = user_agent.to_owned();
        }

        let threshold = read_positive_u64(&lookup, FAILURE_THRESHOLD_ENV)?
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX));
        let recovery = read_positive_u64(&lookup, RECOVERY_SECS_ENV)?.map(Duration::from_secs);
        for breaker in config.breakers.values_mut() {
            if let Some(threshold) = threshold {
                breaker.failure_threshold = threshold;
            }
            if let Some(recovery) = recovery {
                breaker.recovery_timeout = recovery;
            }
        }

        Ok(config)
    }

    pub fn breaker(&self, id: SourceId) -> BreakerConfig {
        self.breakers
            .get(&id)
            .copied()
            .unwrap_or_else(|| default_breaker(id))
    }

    pub fn with_breaker(mut self, id: SourceId, breaker: BreakerConfig) -> Self {
        self.breakers.insert(id, breaker);
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_request_timeout_ms(mut self, request_timeout_ms: u64) -> Self {
        self.request_timeout_ms = request_timeout_ms;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Mining economics used by [`ProfitCalculator`](crate::ProfitCalculator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitConfig {
    pub maintenance_fee_percent: f64,
    pub block_reward_btc: f64,
    pub blocks_per_day: u32,
}

impl Default for ProfitConfig {
    fn default() -> Self {
        Self {
            maintenance_fee_percent: 5.0,
            block_reward_btc: 3.125,
            blocks_per_day: 144,
        }
    }
}

impl ProfitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAINTENANCE_FEE_ENV) {
            let fee = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::NotANumber {
                    name: MAINTENANCE_FEE_ENV,
                    value: raw.clone(),
                })?;
            if !(0.0..=100.0).contains(&fee) {
                return Err(ConfigError::OutOfRange {
                    name: MAINTENANCE_FEE_ENV,
                    value: raw,
                    min: String::from("0"),
                    max: String::from("100"),
                });
            }
            config.maintenance_fee_percent = fee;
        }
        Ok(config)
    }

    pub fn fee_fraction(&self) -> f64 {
        self.maintenance_fee_percent / 100.0
    }
}

fn read_positive_u64<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::NotAnInteger {
            name,
            value: raw.clone(),
        })?;
    if value == 0 {
        return Err(ConfigError::Zero { name });
    }
    Ok(Some(value))
}
