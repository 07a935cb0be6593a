use serde::Deserialize;

use super::{parse_decimal, parse_json};
use crate::data_source::{SourceError, SourceId, Upstream};
use crate::http_client::HttpRequest;

const SPOT_PRICE_URL: &str = "https://api.coinbase.com/v2/prices/BTC-USD/spot";

/// BTC/USD spot price from Coinbase. First in the price chain.
#[derive(Debug, Clone)]
pub struct CoinbaseAdapter {
    url: String,
}

impl Default for CoinbaseAdapter {
    fn default() -> Self {
        Self::with_url(SPOT_PRICE_URL)
    }
}

impl CoinbaseAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Upstream for CoinbaseAdapter {
    type Output = f64;

    fn id(&self) -> SourceId {
        SourceId::Coinbase
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(&self.url).with_header("Accept", "application/json")
    }

    fn parse(&self, body: &str) -> Result<f64, SourceError> {
        let response: CoinbaseSpotResponse = parse_json(self.id(), body)?;
        parse_decimal(self.id(), "data.amount", &response.data.amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CoinbaseSpotResponse {
    data: CoinbaseSpotData,
}

#[derive(Debug, Clone, Deserialize)]
struct CoinbaseSpotData {
    amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spot_amount() {
        let body = r#"{"data":{"amount":"51000.00","base":"BTC","currency":"USD"}}"#;
        assert_eq!(CoinbaseAdapter::default().parse(body).expect("valid"), 51000.0);
    }

    #[test]
    fn rejects_missing_data() {
        assert!(CoinbaseAdapter::default().parse(r#"{"errors":[]}"#).is_err());
    }
}
