use super::parse_decimal;
use crate::data_source::{SourceError, SourceId, Upstream};
use crate::http_client::HttpRequest;

const HASHRATE_URL: &str = "https://blockchain.info/q/hashrate";

const GH_PER_TH: f64 = 1_000.0;

/// Network hashrate from blockchain.info's plaintext query API.
///
/// The endpoint reports GH/s; the adapter yields TH/s.
#[derive(Debug, Clone)]
pub struct BlockchainInfoAdapter {
    url: String,
}

impl Default for BlockchainInfoAdapter {
    fn default() -> Self {
        Self::with_url(HASHRATE_URL)
    }
}

impl BlockchainInfoAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Upstream for BlockchainInfoAdapter {
    type Output = f64;

    fn id(&self) -> SourceId {
        SourceId::BlockchainInfo
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(&self.url).with_header("Accept", "text/plain")
    }

    fn parse(&self, body: &str) -> Result<f64, SourceError> {
        let hashrate_gh = parse_decimal(self.id(), "hashrate", body)?;
        Ok(hashrate_gh / GH_PER_TH)
    }
}
