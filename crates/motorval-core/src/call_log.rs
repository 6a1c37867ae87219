use motorval_store::{ProviderLogRow, ValuationStore};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::failover::CallAttempt;

/// Persists one provider-log row per completed upstream invocation. Logging
/// is best effort: a failed write is reported but never fails the valuation
/// request it describes.
#[derive(Clone)]
pub struct CallLogger {
    store: ValuationStore,
}

impl CallLogger {
    pub fn new(store: ValuationStore) -> Self {
        Self { store }
    }

    pub fn record(&self, attempt: &CallAttempt) {
        let row = ProviderLogRow {
            id: Uuid::new_v4().to_string(),
            vrm: attempt.vrm.as_str().to_owned(),
            provider: attempt.provider.display_name().to_owned(),
            url: attempt.url.clone(),
            duration_ms: attempt.duration_ms as i64,
            status_code: attempt.status_code.map(i32::from),
            error_message: attempt.error_message.clone(),
            timestamp: attempt
                .started_at
                .format(&Rfc3339)
                .unwrap_or_default(),
        };

        if let Err(error) = self.store.insert_provider_log(&row) {
            tracing::warn!(
                vrm = %attempt.vrm,
                provider = %attempt.provider,
                error = %error,
                "failed to persist provider log entry"
            );
        }
    }

    pub fn record_all(&self, attempts: &[CallAttempt]) {
        for attempt in attempts {
            self.record(attempt);
        }
    }
}
