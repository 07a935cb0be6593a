//! Upstream provider adapters.
//!
//! | Adapter | Metric | Response |
//! |---------|--------|----------|
//! | [`CoinbaseAdapter`] | BTC price | JSON, string amount |
//! | [`BinanceAdapter`] | BTC price | JSON, string price |
//! | [`CoingeckoAdapter`] | BTC price | JSON, numeric price |
//! | [`BlockchainInfoAdapter`] | network hashrate | plaintext GH/s |
//! | [`MempoolAdapter`] | difficulty | JSON |

pub mod binance;
pub mod blockchain_info;
pub mod coinbase;
pub mod coingecko;
pub mod mempool;

pub use binance::BinanceAdapter;
pub use blockchain_info::BlockchainInfoAdapter;
pub use coinbase::CoinbaseAdapter;
pub use coingecko::CoingeckoAdapter;
pub use mempool::MempoolAdapter;

use serde::de::DeserializeOwned;

use crate::data_source::{SourceError, SourceId};

pub(crate) fn parse_json<T>(source: SourceId, body: &str) -> Result<T, SourceError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        SourceError::parse(source.as_str(), format!("failed to parse {source} response: {e}"))
    })
}

/// Parses a decimal string such as `"51,000.00"`, dropping thousands separators.
pub(crate) fn parse_decimal(source: SourceId, field: &str, raw: &str) -> Result<f64, SourceError> {
    let cleaned = raw.trim().replace(',', "");
    let value = cleaned.parse::<f64>().map_err(|_| {
        SourceError::parse(
            source.as_str(),
            format!("field '{field}' is not a number: '{raw}'"),
        )
    })?;
    ensure_positive(source, field, value)
}

pub(crate) fn ensure_positive(
    source: SourceId,
    field: &str,
    value: f64,
) -> Result<f64, SourceError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SourceError::parse(
            source.as_str(),
            format!("field '{field}' must be a positive finite number, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[test]
    fn decimal_strips_thousands_separators() {
        let value = parse_decimal(SourceId::Coinbase, "amount", " 51,234.50 ").expect("valid");
        assert_eq!(value, 51234.5);
    }

    #[test]
    fn decimal_rejects_garbage_and_non_positive_values() {
        for raw in ["", "abc", "0", "-1.5", "NaN", "inf"] {
            let error = parse_decimal(SourceId::Binance, "price", raw).expect_err(raw);
            assert_eq!(error.kind(), SourceErrorKind::Parse);
            assert_eq!(error.source_name(), "binance");
        }
    }
}
