use std::sync::Arc;

use motorval_store::{StoreError, ValuationRow, ValuationStore};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::adapters::{PremiumCarAdapter, SuperCarAdapter};
use crate::call_log::CallLogger;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::ServiceConfig;
use crate::domain::{Valuation, Vrm};
use crate::error::ValidationError;
use crate::failover::FailoverValuer;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::provider::ProviderId;

/// Errors surfaced by [`ValuationService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Every upstream declined to value the vehicle; nothing was persisted.
    #[error("no valuation available for {vrm}: {reason}")]
    Unavailable { vrm: Vrm, reason: String },

    #[error("valuation store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted row no longer decodes into a valuation.
    #[error("stored valuation for {vrm} is corrupt: {source}")]
    CorruptRecord {
        vrm: Vrm,
        #[source]
        source: ValidationError,
    },
}

/// Store-first valuation orchestrator. A persisted valuation is immutable
/// and returned as-is forever; only a miss reaches the upstream providers.
pub struct ValuationService {
    store: ValuationStore,
    valuer: FailoverValuer,
    logger: CallLogger,
}

impl ValuationService {
    pub fn new(store: ValuationStore, valuer: FailoverValuer) -> Self {
        let logger = CallLogger::new(store.clone());
        Self {
            store,
            valuer,
            logger,
        }
    }

    /// Wire up the production dependency graph from configuration: reqwest
    /// transport, both provider adapters, and a shared circuit breaker.
    pub fn from_config(store: ValuationStore, config: &ServiceConfig) -> Self {
        Self::with_http_client(store, config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Same wiring with a caller-supplied transport. The adapters' transport
    /// timeout is the breaker's per-call deadline, so a configured
    /// `call_timeout` is honored instead of being cut short by a lower
    /// transport default.
    pub fn with_http_client(
        store: ValuationStore,
        config: &ServiceConfig,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        let transport_timeout_ms = config.breaker.call_timeout.as_millis() as u64;
        let primary = SuperCarAdapter::new(config.super_car_url.clone(), http_client.clone())
            .with_request_timeout_ms(transport_timeout_ms);
        let secondary = PremiumCarAdapter::new(config.premium_car_url.clone(), http_client)
            .with_request_timeout_ms(transport_timeout_ms);
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        let valuer = FailoverValuer::new(Arc::new(primary), Arc::new(secondary), breaker);
        Self::new(store, valuer)
    }

    /// Return the stored valuation for `vrm`, or obtain one from the
    /// upstreams, persist it, and return it. Concurrent first requests for
    /// the same VRM all resolve to the single row that won the insert.
    pub async fn fetch_or_create(
        &self,
        vrm: &Vrm,
        mileage: u32,
    ) -> Result<Valuation, ServiceError> {
        if let Some(row) = self.store.find_valuation(vrm.as_str())? {
            tracing::debug!(vrm = %vrm, "serving stored valuation");
            return valuation_from_row(vrm, &row);
        }

        let fetched = match self.valuer.fetch(vrm, mileage).await {
            Ok(success) => {
                self.logger.record_all(&success.attempts);
                success.valuation
            }
            Err(failure) => {
                self.logger.record_all(&failure.attempts);
                return Err(ServiceError::Unavailable {
                    vrm: vrm.clone(),
                    reason: failure.reason(),
                });
            }
        };

        match self.store.insert_valuation(&row_from_valuation(&fetched)) {
            Ok(()) => Ok(fetched),
            Err(error) if error.is_unique_violation() => {
                // Lost the insert race; adopt whatever the winner persisted.
                tracing::debug!(vrm = %vrm, "concurrent insert won, adopting stored valuation");
                match self.store.find_valuation(vrm.as_str())? {
                    Some(row) => valuation_from_row(vrm, &row),
                    None => Ok(fetched),
                }
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Read-only lookup; never calls an upstream.
    pub fn lookup(&self, vrm: &Vrm) -> Result<Option<Valuation>, ServiceError> {
        match self.store.find_valuation(vrm.as_str())? {
            Some(row) => valuation_from_row(vrm, &row).map(Some),
            None => Ok(None),
        }
    }

    pub fn store(&self) -> &ValuationStore {
        &self.store
    }
}

fn valuation_from_row(vrm: &Vrm, row: &ValuationRow) -> Result<Valuation, ServiceError> {
    // Rows written before provider attribution existed carry NULL; they all
    // came from the primary upstream, so default at read time and leave the
    // row untouched.
    let provider = match row.provider.as_deref() {
        Some(label) => label
            .parse::<ProviderId>()
            .map_err(|source| ServiceError::CorruptRecord {
                vrm: vrm.clone(),
                source,
            })?,
        None => ProviderId::SuperCar,
    };

    Valuation::new(vrm.clone(), row.lowest_value, row.highest_value, provider).map_err(|source| {
        ServiceError::CorruptRecord {
            vrm: vrm.clone(),
            source,
        }
    })
}

fn row_from_valuation(valuation: &Valuation) -> ValuationRow {
    ValuationRow {
        vrm: valuation.vrm.as_str().to_owned(),
        lowest_value: valuation.lowest_value,
        highest_value: valuation.highest_value,
        provider: Some(valuation.provider.display_name().to_owned()),
        created_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    }
}
