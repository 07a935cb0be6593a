//! Market metrics served to the marketplace and their static fallbacks.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// BTC price in USD used when no source and no cached value is available.
pub const FALLBACK_BTC_PRICE: f64 = 50_000.0;

/// Network hashrate in TH/s used when no source and no cached value is available.
pub const FALLBACK_NETWORK_HASHRATE_TH: f64 = 500_000_000.0;

/// Mining difficulty used when no source and no cached value is available.
pub const FALLBACK_DIFFICULTY: f64 = 50_000_000_000_000.0;

/// Logical metric served by the aggregator. Each metric owns one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    BtcPrice,
    NetworkHashrate,
    Difficulty,
}

impl Metric {
    pub const fn cache_key(self) -> &'static str {
        match self {
            Self::BtcPrice => "btc_price",
            Self::NetworkHashrate => "network_hashrate",
            Self::Difficulty => "difficulty",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cache_key())
    }
}

/// Current mining difficulty and the projected change at the next retarget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub difficulty: f64,
    pub adjustment: f64,
}

impl Difficulty {
    pub const FALLBACK: Self = Self {
        difficulty: FALLBACK_DIFFICULTY,
        adjustment: 0.0,
    };
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Snapshot of all three metrics, as rendered by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub btc_price: f64,
    pub network_hashrate_th: f64,
    pub difficulty: Difficulty,
}
