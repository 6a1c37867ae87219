use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Runtime circuit state for primary provider upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
///
/// The breaker trips on an error percentage over a rolling window of recent
/// call outcomes, but only once the window holds at least `volume_threshold`
/// outcomes. An open circuit admits a single probe after `reset_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Per-call deadline applied to guarded requests.
    pub call_timeout: Duration,
    /// Failure percentage at or above which the circuit trips.
    pub error_threshold_pct: u8,
    /// How long an open circuit waits before admitting a probe.
    pub reset_timeout: Duration,
    /// Minimum recorded outcomes before the error percentage is evaluated.
    pub volume_threshold: usize,
    /// Rolling window capacity; oldest outcomes are evicted beyond this.
    pub window_size: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(15_000),
            error_threshold_pct: 50,
            reset_timeout: Duration::from_millis(5_000),
            volume_threshold: 5,
            window_size: 10,
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    // true = success, false = failure; front is oldest.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitInner {
    fn new(window_size: usize) -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::with_capacity(window_size),
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Thread-safe rolling-window circuit breaker guarding the primary provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let window_size = config.window_size.max(1);
        Self {
            config,
            inner: Mutex::new(CircuitInner::new(window_size)),
        }
    }

    /// Whether a guarded call may proceed. An open circuit whose cooldown has
    /// elapsed transitions to half-open and admits the caller as the single
    /// probe; other callers are held back until the probe resolves.
    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
            CircuitState::Open => {
                let can_probe = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(false);

                if can_probe {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    inner.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        if inner.state == CircuitState::HalfOpen {
            // Successful probe: close and start from a clean window so stale
            // failures cannot re-trip the circuit immediately.
            inner.state = CircuitState::Closed;
            inner.window.clear();
            inner.opened_at = None;
            inner.probe_in_flight = false;
            return;
        }
        self.push_outcome(&mut inner, true);
    }

    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.probe_in_flight = false;
            return;
        }
        self.push_outcome(&mut inner, false);

        if inner.state == CircuitState::Closed && self.over_threshold(&inner) {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state
    }

    pub const fn call_timeout(&self) -> Duration {
        self.config.call_timeout
    }

    fn push_outcome(&self, inner: &mut CircuitInner, success: bool) {
        let window_size = self.config.window_size.max(1);
        while inner.window.len() >= window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(success);
    }

    fn over_threshold(&self, inner: &CircuitInner) -> bool {
        let total = inner.window.len();
        if total < self.config.volume_threshold.max(1) {
            return false;
        }
        let failures = inner.window.iter().filter(|outcome| !**outcome).count();
        // Integer form of failures / total >= threshold_pct / 100.
        failures * 100 >= usize::from(self.config.error_threshold_pct) * total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(volume_threshold: usize, error_threshold_pct: u8) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            call_timeout: Duration::from_millis(100),
            error_threshold_pct,
            reset_timeout: Duration::from_millis(20),
            volume_threshold,
            window_size: 10,
        })
    }

    #[test]
    fn stays_closed_below_volume_threshold() {
        let breaker = breaker(5, 50);
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn trips_at_error_percentage_once_volume_is_met() {
        let breaker = breaker(5, 50);
        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Fifth outcome: 3 failures out of 5 is 60% >= 50%.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn successes_keep_the_ratio_under_threshold() {
        let breaker = breaker(5, 50);
        for _ in 0..4 {
            breaker.record_success();
        }
        breaker.record_failure();
        breaker.record_failure();
        // 2 failures out of 6 is 33%.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn rolling_window_evicts_oldest_outcomes() {
        let breaker = breaker(5, 50);
        for _ in 0..10 {
            breaker.record_success();
        }
        // Five failures displace five successes: 5/10 = 50% trips.
        for _ in 0..4 {
            breaker.record_failure();
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn open_circuit_admits_a_probe_after_the_reset_timeout() {
        let breaker = breaker(1, 1);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());

        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn successful_probe_closes_with_a_clean_window() {
        let breaker = breaker(1, 1);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.allow_request());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // The old failure must not count against the fresh window.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_admits_exactly_one_probe_until_it_resolves() {
        let breaker = breaker(1, 1);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(30));

        assert!(breaker.allow_request());
        // The probe is still in flight; nobody else gets through.
        assert!(!breaker.allow_request());
        assert!(!breaker.allow_request());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn failed_probe_reopens_immediately() {
        let breaker = breaker(1, 1);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.allow_request());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }
}
