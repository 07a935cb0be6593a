//! Best-effort market-data aggregation.
//!
//! [`MarketDataService`] owns the metric cache and every source (and with it,
//! every circuit breaker). Build one per process and share it behind an
//! `Arc`; all operations take `&self`.
//!
//! Each query resolves in this order:
//!
//! 1. a cached value younger than the TTL;
//! 2. the first source, in priority order, that returns a value;
//! 3. the last cached value, however stale;
//! 4. the metric's static fallback constant.
//!
//! Whatever steps 2–4 produce is written back to the cache, so a fully
//! degraded metric is not re-fetched until the TTL elapses again.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::adapters::{
    BinanceAdapter, BlockchainInfoAdapter, CoinbaseAdapter, CoingeckoAdapter, MempoolAdapter,
};
use crate::cache::MetricCache;
use crate::circuit_breaker::BreakerStatus;
use crate::config::MarketDataConfig;
use crate::data_source::{GuardedSource, MetricSource, SourceErrorKind, Upstream};
use crate::domain::{
    Difficulty, Metric, NetworkStats, FALLBACK_BTC_PRICE, FALLBACK_NETWORK_HASHRATE_TH,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};

/// A source shared between the service and whoever built it.
pub type SharedSource<T> = Arc<dyn MetricSource<T>>;

/// Process-wide market-data aggregator.
pub struct MarketDataService {
    cache: MetricCache,
    price_sources: Vec<SharedSource<f64>>,
    hashrate_source: SharedSource<f64>,
    difficulty_source: SharedSource<Difficulty>,
}

impl MarketDataService {
    /// Production service over reqwest with default configuration.
    pub fn new() -> Self {
        Self::over_reqwest(MarketDataConfig::default())
    }

    /// Production service over reqwest, identified upstream by
    /// `config.user_agent`.
    pub fn over_reqwest(config: MarketDataConfig) -> Self {
        let http_client = Arc::new(ReqwestHttpClient::with_user_agent(&config.user_agent));
        Self::from_config(config, http_client)
    }

    /// Production sources wired to `http_client` and tuned by `config`.
    pub fn from_config(config: MarketDataConfig, http_client: Arc<dyn HttpClient>) -> Self {
        MarketDataServiceBuilder::new(http_client)
            .config(config)
            .build()
    }

    pub fn builder(http_client: Arc<dyn HttpClient>) -> MarketDataServiceBuilder {
        MarketDataServiceBuilder::new(http_client)
    }

    /// BTC price in USD.
    pub async fn get_btc_price(&self) -> f64 {
        self.resolve(Metric::BtcPrice, &self.price_sources, FALLBACK_BTC_PRICE)
            .await
    }

    /// Network hashrate in TH/s.
    pub async fn get_network_hashrate(&self) -> f64 {
        self.resolve(
            Metric::NetworkHashrate,
            std::slice::from_ref(&self.hashrate_source),
            FALLBACK_NETWORK_HASHRATE_TH,
        )
        .await
    }

    pub async fn get_mining_difficulty(&self) -> Difficulty {
        self.resolve(
            Metric::Difficulty,
            std::slice::from_ref(&self.difficulty_source),
            Difficulty::FALLBACK,
        )
        .await
    }

    pub async fn get_network_stats(&self) -> NetworkStats {
        let (btc_price, network_hashrate_th, difficulty) = tokio::join!(
            self.get_btc_price(),
            self.get_network_hashrate(),
            self.get_mining_difficulty(),
        );
        NetworkStats {
            btc_price,
            network_hashrate_th,
            difficulty,
        }
    }

    /// Breaker snapshot for every source, keyed by source name.
    pub fn get_circuit_breaker_status(&self) -> BTreeMap<String, BreakerStatus> {
        let price = self
            .price_sources
            .iter()
            .map(|source| (source.name().to_owned(), source.breaker().status()));
        let hashrate = std::iter::once((
            self.hashrate_source.name().to_owned(),
            self.hashrate_source.breaker().status(),
        ));
        let difficulty = std::iter::once((
            self.difficulty_source.name().to_owned(),
            self.difficulty_source.breaker().status(),
        ));

        price.chain(hashrate).chain(difficulty).collect()
    }

    /// Last value stored for `metric`, regardless of age.
    pub async fn cached(&self, metric: Metric) -> Option<Value> {
        self.cache.last_value(metric.cache_key()).await
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    async fn resolve<T>(&self, metric: Metric, sources: &[SharedSource<T>], fallback: T) -> T
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let fallback_ref = &fallback;
        let value = self
            .cache
            .get_or_fetch(metric.cache_key(), move || async move {
                self.fetch_or_degrade(metric, sources, fallback_ref).await
            })
            .await;

        match serde_json::from_value(value) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(%metric, "cached value has unexpected shape, using fallback: {e}");
                fallback
            }
        }
    }

    async fn fetch_or_degrade<T>(
        &self,
        metric: Metric,
        sources: &[SharedSource<T>],
        fallback: &T,
    ) -> Value
    where
        T: Serialize + Send + Sync,
    {
        for source in sources {
            match source.fetch().await {
                Ok(value) => match serde_json::to_value(&value) {
                    Ok(value) => {
                        debug!(%metric, source = source.name(), "fetched fresh value");
                        return value;
                    }
                    Err(e) => {
                        warn!(%metric, source = source.name(), "value not serializable: {e}");
                    }
                },
                Err(error) if error.kind() == SourceErrorKind::CircuitOpen => {
                    debug!(%metric, source = source.name(), "circuit open, skipping source");
                }
                Err(_) => {}
            }
        }

        if let Some(stale) = self.cache.last_value(metric.cache_key()).await {
            warn!(%metric, "all sources unavailable, serving last cached value");
            return stale;
        }

        error!(%metric, "all sources unavailable and nothing cached, serving static fallback");
        serde_json::to_value(fallback).unwrap_or(Value::Null)
    }
}

impl Default for MarketDataService {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles a [`MarketDataService`].
///
/// Any metric whose sources are not set explicitly gets the production
/// adapters for it, wired to the builder's HTTP client.
pub struct MarketDataServiceBuilder {
    http_client: Arc<dyn HttpClient>,
    config: MarketDataConfig,
    price_sources: Option<Vec<SharedSource<f64>>>,
    hashrate_source: Option<SharedSource<f64>>,
    difficulty_source: Option<SharedSource<Difficulty>>,
}

impl MarketDataServiceBuilder {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            config: MarketDataConfig::default(),
            price_sources: None,
            hashrate_source: None,
            difficulty_source: None,
        }
    }

    pub fn config(mut self, config: MarketDataConfig) -> Self {
        self.config = config;
        self
    }

    /// Price sources in priority order.
    pub fn price_sources(mut self, sources: Vec<SharedSource<f64>>) -> Self {
        self.price_sources = Some(sources);
        self
    }

    pub fn hashrate_source(mut self, source: SharedSource<f64>) -> Self {
        self.hashrate_source = Some(source);
        self
    }

    pub fn difficulty_source(mut self, source: SharedSource<Difficulty>) -> Self {
        self.difficulty_source = Some(source);
        self
    }

    pub fn build(mut self) -> MarketDataService {
        let price_sources = match self.price_sources.take() {
            Some(sources) => sources,
            None => vec![
                self.guarded(CoinbaseAdapter::default()),
                self.guarded(BinanceAdapter::default()),
                self.guarded(CoingeckoAdapter::default()),
            ],
        };
        let hashrate_source = match self.hashrate_source.take() {
            Some(source) => source,
            None => self.guarded(BlockchainInfoAdapter::default()),
        };
        let difficulty_source = match self.difficulty_source.take() {
            Some(source) => source,
            None => self.guarded(MempoolAdapter::default()),
        };

        MarketDataService {
            cache: MetricCache::new(self.config.cache_ttl),
            price_sources,
            hashrate_source,
            difficulty_source,
        }
    }

    fn guarded<U>(&self, upstream: U) -> SharedSource<U::Output>
    where
        U: Upstream + 'static,
    {
        let breaker = self.config.breaker(upstream.id());
        Arc::new(
            GuardedSource::new(upstream, Arc::clone(&self.http_client), breaker)
                .with_timeout_ms(self.config.request_timeout_ms),
        )
    }
}
