use serde::Deserialize;

use super::{parse_decimal, parse_json};
use crate::data_source::{SourceError, SourceId, Upstream};
use crate::http_client::HttpRequest;

const TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT";

/// BTC/USDT last price from Binance, used as USD.
#[derive(Debug, Clone)]
pub struct BinanceAdapter {
    url: String,
}

impl Default for BinanceAdapter {
    fn default() -> Self {
        Self::with_url(TICKER_URL)
    }
}

impl BinanceAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Upstream for BinanceAdapter {
    type Output = f64;

    fn id(&self) -> SourceId {
        SourceId::Binance
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(&self.url)
    }

    fn parse(&self, body: &str) -> Result<f64, SourceError> {
        let ticker: BinanceTicker = parse_json(self.id(), body)?;
        parse_decimal(self.id(), "price", &ticker.price)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BinanceTicker {
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticker_price() {
        let body = r#"{"symbol":"BTCUSDT","price":"52000.00000000"}"#;
        assert_eq!(BinanceAdapter::default().parse(body).expect("valid"), 52000.0);
    }

    #[test]
    fn rejects_error_payload() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(BinanceAdapter::default().parse(body).is_err());
    }
}
