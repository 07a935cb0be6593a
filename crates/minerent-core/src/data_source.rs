//! Source contracts for upstream market-data providers.
//!
//! Every provider is an [`Upstream`]: it knows which URL to hit and how to
//! read the body. [`GuardedSource`] wraps an upstream with its circuit
//! breaker and the shared transport, and is what the aggregator calls
//! through the provider-agnostic [`MetricSource`] trait.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::circuit_breaker::{BreakerConfig, CircuitBreaker};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};

/// Canonical identifiers for the upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Coinbase,
    Binance,
    Coingecko,
    BlockchainInfo,
    Mempool,
}

impl SourceId {
    pub const ALL: [Self; 5] = [
        Self::Coinbase,
        Self::Binance,
        Self::Coingecko,
        Self::BlockchainInfo,
        Self::Mempool,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coinbase => "coinbase",
            Self::Binance => "binance",
            Self::Coingecko => "coingecko",
            Self::BlockchainInfo => "blockchain_info",
            Self::Mempool => "mempool",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a source produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Breaker refused the call; nothing was sent upstream.
    CircuitOpen,
    Transport,
    Status,
    RateLimited,
    Parse,
}

/// "Unavailable" outcome of a single fetch attempt.
///
/// Never surfaced past the aggregator; it only tells the fallback chain to
/// move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    source: String,
    message: String,
}

impl SourceError {
    fn new(kind: SourceErrorKind, source: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.to_owned(),
            message: message.into(),
        }
    }

    pub fn circuit_open(source: &str) -> Self {
        Self::new(
            SourceErrorKind::CircuitOpen,
            source,
            "circuit breaker is open; skipping upstream call",
        )
    }

    pub fn transport(source: &str, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transport, source, message)
    }

    pub fn status(source: &str, status: u16) -> Self {
        Self::new(
            SourceErrorKind::Status,
            source,
            format!("upstream returned status {status}"),
        )
    }

    pub fn rate_limited(source: &str) -> Self {
        Self::new(
            SourceErrorKind::RateLimited,
            source,
            "upstream rate limit exceeded (429)",
        )
    }

    pub fn parse(source: &str, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Parse, source, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn source_name(&self) -> &str {
        &self.source
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::CircuitOpen => "source.circuit_open",
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Status => "source.status",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Parse => "source.parse",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.source, self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Provider-agnostic view of one breaker-guarded source for a metric.
pub trait MetricSource<T>: Send + Sync {
    /// Breaker guarding this source; also used for status reporting.
    fn breaker(&self) -> &CircuitBreaker;

    /// One attempt against the upstream. No retries.
    fn fetch(&self) -> FetchFuture<'_, T>;

    fn name(&self) -> &str {
        self.breaker().name()
    }
}

/// Endpoint and response shape of one upstream provider.
pub trait Upstream: Send + Sync {
    type Output: Send;

    fn id(&self) -> SourceId;

    fn request(&self) -> HttpRequest;

    fn parse(&self, body: &str) -> Result<Self::Output, SourceError>;
}

/// An [`Upstream`] gated by its own circuit breaker.
pub struct GuardedSource<U> {
    upstream: U,
    http_client: Arc<dyn HttpClient>,
    breaker: CircuitBreaker,
    timeout_ms: u64,
}

impl<U: Upstream> GuardedSource<U> {
    pub fn new(upstream: U, http_client: Arc<dyn HttpClient>, breaker: BreakerConfig) -> Self {
        let breaker = CircuitBreaker::new(upstream.id().as_str(), breaker);
        Self {
            upstream,
            http_client,
            breaker,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch_once(&self) -> Result<U::Output, SourceError> {
        let name = self.upstream.id().as_str();
        let Some(permit) = self.breaker.try_acquire() else {
            return Err(SourceError::circuit_open(name));
        };

        // The permit settles on every exit path, including cancellation.
        match self.attempt(name).await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(error) => {
                permit.failure();
                warn!(
                    source = name,
                    code = error.code(),
                    "market data fetch failed: {}",
                    error.message()
                );
                Err(error)
            }
        }
    }

    async fn attempt(&self, name: &str) -> Result<U::Output, SourceError> {
        let request = self.upstream.request().with_timeout_ms(self.timeout_ms);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::transport(name, error.message()))?;

        if response.is_rate_limited() {
            return Err(SourceError::rate_limited(name));
        }
        if !response.is_success() {
            return Err(SourceError::status(name, response.status));
        }

        self.upstream.parse(&response.body)
    }
}

impl<U> MetricSource<U::Output> for GuardedSource<U>
where
    U: Upstream,
{
    fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn fetch(&self) -> FetchFuture<'_, U::Output> {
        Box::pin(self.fetch_once())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::http_client::{HttpError, HttpResponse};
    use std::sync::Mutex;

    struct Echo;

    impl Upstream for Echo {
        type Output = f64;

        fn id(&self) -> SourceId {
            SourceId::Coinbase
        }

        fn request(&self) -> HttpRequest {
            HttpRequest::get("https://echo.test/price")
        }

        fn parse(&self, body: &str) -> Result<f64, SourceError> {
            body.trim()
                .parse::<f64>()
                .map_err(|e| SourceError::parse("coinbase", e.to_string()))
        }
    }

    struct Scripted {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().expect("lock").len()
        }
    }

    impl HttpClient for Scripted {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.seen.lock().expect("lock").push(request);
            let next = self
                .responses
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or_else(|| Err(HttpError::new("no scripted response")));
            Box::pin(async move { next })
        }
    }

    fn guarded(client: Arc<Scripted>, failure_threshold: u32) -> GuardedSource<Echo> {
        GuardedSource::new(
            Echo,
            client,
            BreakerConfig {
                failure_threshold,
                ..BreakerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn success_parses_body_and_closes_breaker() {
        let client = Arc::new(Scripted::new(vec![Ok(HttpResponse::ok("51000.5"))]));
        let source = guarded(Arc::clone(&client), 3);

        let value = source.fetch().await.expect("fetch succeeds");

        assert_eq!(value, 51000.5);
        assert_eq!(source.name(), "coinbase");
        assert_eq!(source.breaker().state(), CircuitState::Closed);
        assert_eq!(client.seen.lock().expect("lock")[0].timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn every_failure_class_counts_against_breaker() {
        let client = Arc::new(Scripted::new(vec![
            Err(HttpError::new("connection refused")),
            Ok(HttpResponse::new(500, "")),
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::ok("not a number")),
        ]));
        let source = guarded(Arc::clone(&client), 10);

        let kinds = [
            source.fetch().await.expect_err("transport").kind(),
            source.fetch().await.expect_err("status").kind(),
            source.fetch().await.expect_err("rate limit").kind(),
            source.fetch().await.expect_err("parse").kind(),
        ];

        assert_eq!(
            kinds,
            [
                SourceErrorKind::Transport,
                SourceErrorKind::Status,
                SourceErrorKind::RateLimited,
                SourceErrorKind::Parse,
            ]
        );
        assert_eq!(source.breaker().failure_count(), 4);
    }

    #[tokio::test]
    async fn open_breaker_skips_the_network() {
        let client = Arc::new(Scripted::new(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::ok("1.0")),
        ]));
        let source = guarded(Arc::clone(&client), 1).with_timeout_ms(250);

        assert!(source.fetch().await.is_err());
        assert_eq!(source.breaker().state(), CircuitState::Open);

        let error = source.fetch().await.expect_err("breaker is open");
        assert_eq!(error.kind(), SourceErrorKind::CircuitOpen);
        assert_eq!(error.code(), "source.circuit_open");
        assert_eq!(client.calls(), 1);
        assert_eq!(client.seen.lock().expect("lock")[0].timeout_ms, 250);
    }

    /// Hangs every request while `stalled` is set, answers "1.0" otherwise.
    #[derive(Default)]
    struct Stalling {
        stalled: std::sync::atomic::AtomicBool,
    }

    impl HttpClient for Stalling {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            if self.stalled.load(std::sync::atomic::Ordering::SeqCst) {
                Box::pin(std::future::pending::<Result<HttpResponse, HttpError>>())
            } else {
                Box::pin(async { Ok(HttpResponse::ok("1.0")) })
            }
        }
    }

    #[tokio::test]
    async fn cancelled_half_open_call_is_recorded_as_failure() {
        let client = Arc::new(Stalling::default());
        let source = GuardedSource::new(
            Echo,
            Arc::clone(&client) as Arc<dyn HttpClient>,
            BreakerConfig {
                failure_threshold: 1,
                recovery_timeout: std::time::Duration::from_millis(10),
                half_open_max_calls: 1,
            },
        );
        source.breaker().record_failure();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        client.stalled.store(true, std::sync::atomic::Ordering::SeqCst);
        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(20), source.fetch()).await;
        assert!(outcome.is_err());
        assert_eq!(source.breaker().state(), CircuitState::Open);

        client.stalled.store(false, std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(source.fetch().await.expect("breaker admits a new trial"), 1.0);
        assert_eq!(source.breaker().state(), CircuitState::Closed);
    }
}
