use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{Valuation, Vrm};
use crate::provider::{FetchedValuation, ProviderError, ProviderId, ValuationProvider};

/// One completed upstream invocation, recorded whether it succeeded or not.
/// A fast-failed call (circuit open, primary skipped) produces no attempt
/// because no request was made.
#[derive(Debug, Clone)]
pub struct CallAttempt {
    pub vrm: Vrm,
    pub provider: ProviderId,
    pub url: String,
    pub started_at: OffsetDateTime,
    pub duration_ms: u64,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl CallAttempt {
    pub fn succeeded(&self) -> bool {
        self.error_message.is_none()
    }
}

/// A valuation obtained from one of the upstreams, with the attempts made
/// along the way.
#[derive(Debug, Clone)]
pub struct FailoverSuccess {
    pub valuation: Valuation,
    pub attempts: Vec<CallAttempt>,
}

/// Both upstreams declined to produce a valuation.
#[derive(Debug, Clone)]
pub struct FailoverFailure {
    pub attempts: Vec<CallAttempt>,
    pub errors: Vec<ProviderError>,
}

impl FailoverFailure {
    /// Single-line summary of every upstream error, oldest first.
    pub fn reason(&self) -> String {
        self.errors
            .iter()
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Primary-then-secondary valuation fetcher. The primary is guarded by the
/// circuit breaker and its per-call timeout; the secondary is the last
/// resort and runs unguarded.
pub struct FailoverValuer {
    primary: Arc<dyn ValuationProvider>,
    secondary: Arc<dyn ValuationProvider>,
    breaker: Arc<CircuitBreaker>,
}

impl FailoverValuer {
    pub fn new(
        primary: Arc<dyn ValuationProvider>,
        secondary: Arc<dyn ValuationProvider>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            primary,
            secondary,
            breaker,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn fetch(
        &self,
        vrm: &Vrm,
        mileage: u32,
    ) -> Result<FailoverSuccess, FailoverFailure> {
        let mut attempts = Vec::new();
        let mut errors = Vec::new();

        if self.breaker.allow_request() {
            let (attempt, outcome) = self
                .attempt(self.primary.as_ref(), vrm, mileage, Some(self.breaker.call_timeout()))
                .await;
            attempts.push(attempt);
            match outcome {
                Ok(fetched) => {
                    self.breaker.record_success();
                    return Ok(FailoverSuccess {
                        valuation: fetched.valuation,
                        attempts,
                    });
                }
                Err(error) => {
                    self.breaker.record_failure();
                    tracing::warn!(
                        vrm = %vrm,
                        provider = %self.primary.id(),
                        error = %error,
                        "primary valuation provider failed, falling back"
                    );
                    errors.push(error);
                }
            }
        } else {
            tracing::warn!(
                vrm = %vrm,
                provider = %self.primary.id(),
                "circuit open, skipping primary valuation provider"
            );
        }

        let (attempt, outcome) = self.attempt(self.secondary.as_ref(), vrm, mileage, None).await;
        attempts.push(attempt);
        match outcome {
            Ok(fetched) => Ok(FailoverSuccess {
                valuation: fetched.valuation,
                attempts,
            }),
            Err(error) => {
                tracing::warn!(
                    vrm = %vrm,
                    provider = %self.secondary.id(),
                    error = %error,
                    "fallback valuation provider failed"
                );
                errors.push(error);
                Err(FailoverFailure { attempts, errors })
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn ValuationProvider,
        vrm: &Vrm,
        mileage: u32,
        deadline: Option<std::time::Duration>,
    ) -> (CallAttempt, Result<FetchedValuation, ProviderError>) {
        let url = provider.request_url(vrm, mileage);
        let started_at = OffsetDateTime::now_utc();
        let clock = Instant::now();

        let outcome = match deadline {
            Some(limit) => match tokio::time::timeout(limit, provider.fetch(vrm, mileage)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timed_out(limit)),
            },
            None => provider.fetch(vrm, mileage).await,
        };

        let duration_ms = clock.elapsed().as_millis() as u64;
        let attempt = CallAttempt {
            vrm: vrm.clone(),
            provider: provider.id(),
            url,
            started_at,
            duration_ms,
            status_code: match &outcome {
                Ok(fetched) => Some(fetched.status_code),
                Err(error) => error.status_code(),
            },
            error_message: outcome.as_ref().err().map(|error| error.to_string()),
        };
        (attempt, outcome)
    }
}
