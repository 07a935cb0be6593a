use serde::Deserialize;

use super::{ensure_positive, parse_json};
use crate::data_source::{SourceError, SourceId, Upstream};
use crate::http_client::HttpRequest;

const SIMPLE_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";

/// BTC/USD price from CoinGecko's public API.
///
/// Last in the price chain. The free tier throttles aggressively, so its
/// breaker gets a longer recovery timeout than the others.
#[derive(Debug, Clone)]
pub struct CoingeckoAdapter {
    url: String,
}

impl Default for CoingeckoAdapter {
    fn default() -> Self {
        Self::with_url(SIMPLE_PRICE_URL)
    }
}

impl CoingeckoAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Upstream for CoingeckoAdapter {
    type Output = f64;

    fn id(&self) -> SourceId {
        SourceId::Coingecko
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(&self.url).with_header("Accept", "application/json")
    }

    fn parse(&self, body: &str) -> Result<f64, SourceError> {
        let response: CoingeckoSimplePrice = parse_json(self.id(), body)?;
        ensure_positive(self.id(), "bitcoin.usd", response.bitcoin.usd)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CoingeckoSimplePrice {
    bitcoin: CoingeckoQuote,
}

#[derive(Debug, Clone, Deserialize)]
struct CoingeckoQuote {
    usd: f64,
}
