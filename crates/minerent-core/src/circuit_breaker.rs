//! Per-upstream circuit breaker.
//!
//! ```text
//! Closed ──(failures >= threshold)──▶ Open
//! Open ──(recovery timeout elapsed)──▶ HalfOpen
//! HalfOpen ──(success)──▶ Closed
//! HalfOpen ──(failure)──▶ Open
//! ```

use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

/// Runtime circuit state for an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
        }
    }
}

impl BreakerConfig {
    pub fn with_recovery_timeout(mut self, recovery_timeout: Duration) -> Self {
        self.recovery_timeout = recovery_timeout;
        self
    }
}

/// Point-in-time view of a breaker, as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_failure: Option<OffsetDateTime>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    last_failure_wall: Option<OffsetDateTime>,
    half_open_calls: u32,
}

impl Default for BreakerInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            last_failure_wall: None,
            half_open_calls: 0,
        }
    }
}

/// Thread-safe circuit breaker guarding one upstream source.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a call to the upstream may proceed right now.
    ///
    /// An open breaker whose recovery timeout has elapsed moves to half-open
    /// and admits the caller. While half-open, at most `half_open_max_calls`
    /// further probes are admitted until a success or failure is recorded.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure_at
                    .map(|failed_at| failed_at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);

                if recovered {
                    info!(breaker = %self.name, "circuit half-open, probing upstream");
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Admits one call like [`can_execute`](Self::can_execute) and returns a
    /// permit that settles the outcome.
    ///
    /// A permit dropped before [`CallPermit::success`] or
    /// [`CallPermit::failure`] counts as a failure, so a cancelled call can
    /// never hold a half-open slot.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        self.can_execute().then_some(CallPermit {
            breaker: self,
            settled: false,
        })
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            info!(breaker = %self.name, "circuit closed, upstream recovered");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.half_open_calls = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        inner.last_failure_wall = Some(OffsetDateTime::now_utc());

        match inner.state {
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "half-open probe failed, circuit re-opened");
                inner.state = CircuitState::Open;
            }
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                warn!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    "failure threshold reached, circuit opened"
                );
                inner.state = CircuitState::Open;
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        BreakerStatus {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure: inner.last_failure_wall,
        }
    }

    // Every transition is a set of plain field writes, so a poisoned guard
    // still holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One admitted call against a [`CircuitBreaker`].
#[must_use = "a dropped permit is recorded as a failure"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(breaker = %self.breaker.name, "call abandoned before completion");
            self.breaker.record_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, recovery_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test_breaker",
            BreakerConfig {
                failure_threshold,
                recovery_timeout,
                half_open_max_calls: 1,
            },
        )
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker(2, Duration::from_secs(60));

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn success_resets_failure_count_while_closed() {
        let breaker = breaker(3, Duration::from_secs(60));

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn transitions_to_half_open_after_timeout_then_closes_on_success() {
        let breaker = breaker(2, Duration::from_millis(5));

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());

        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_admits_bounded_probes() {
        let breaker = CircuitBreaker::new(
            "probe_breaker",
            BreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_millis(1),
                half_open_max_calls: 2,
            },
        );

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));

        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.can_execute());
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = breaker(1, Duration::from_millis(50));

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 2);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn status_reports_last_failure_time() {
        let breaker = breaker(3, Duration::from_secs(60));
        assert_eq!(breaker.status().last_failure, None);

        breaker.record_failure();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 1);
        assert!(status.last_failure.is_some());

        let json = serde_json::to_value(status).expect("status serializes");
        assert_eq!(json["state"], "CLOSED");
    }

    #[test]
    fn concurrent_failures_are_not_lost() {
        let breaker = std::sync::Arc::new(breaker(1_000, Duration::from_secs(60)));
        let handles = (0..8)
            .map(|_| {
                let breaker = std::sync::Arc::clone(&breaker);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        breaker.record_failure();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("worker thread completes");
        }

        assert_eq!(breaker.failure_count(), 400);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn dropped_half_open_permit_counts_as_failure() {
        let breaker = breaker(1, Duration::from_millis(5));

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(10));

        let permit = breaker.try_acquire().expect("recovery window elapsed");
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        drop(permit);

        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 2);

        std::thread::sleep(Duration::from_millis(10));
        let permit = breaker.try_acquire().expect("breaker admits a new trial");
        permit.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn settled_permit_records_only_once() {
        let breaker = breaker(3, Duration::from_secs(60));

        breaker.try_acquire().expect("closed").failure();
        breaker.try_acquire().expect("closed").failure();
        assert_eq!(breaker.failure_count(), 2);

        breaker.try_acquire().expect("closed").success();
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
