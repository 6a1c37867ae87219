use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Valuation, Vrm};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{FetchedValuation, ProviderError, ProviderId, ValuationProvider};

/// Super Car Valuations adapter, the primary upstream. Answers JSON with
/// nested lower/upper bounds.
#[derive(Clone)]
pub struct SuperCarAdapter {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    request_timeout_ms: u64,
}

impl SuperCarAdapter {
    pub fn new(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
            request_timeout_ms: 10_000,
        }
    }

    pub fn with_request_timeout_ms(mut self, request_timeout_ms: u64) -> Self {
        self.request_timeout_ms = request_timeout_ms;
        self
    }

    async fn fetch_valuation(
        &self,
        vrm: &Vrm,
        mileage: u32,
    ) -> Result<FetchedValuation, ProviderError> {
        let request =
            HttpRequest::get(self.request_url(vrm, mileage)).with_timeout_ms(self.request_timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.is_timeout() {
                ProviderError::timed_out(Duration::from_millis(self.request_timeout_ms))
            } else {
                ProviderError::transport(format!(
                    "super car valuations transport error: {}",
                    error.message()
                ))
            }
        })?;

        if !response.is_success() {
            return Err(ProviderError::status(ProviderId::SuperCar, response.status));
        }

        let decoded: SuperCarResponse = serde_json::from_str(&response.body).map_err(|error| {
            ProviderError::malformed(format!(
                "failed to parse super car valuations response: {error}"
            ))
        })?;

        let valuation = Valuation::new(
            vrm.clone(),
            decoded.valuation.lower_value,
            decoded.valuation.upper_value,
            ProviderId::SuperCar,
        )
        .map_err(|error| ProviderError::malformed(error.to_string()))?;

        Ok(FetchedValuation {
            valuation,
            status_code: response.status,
        })
    }
}

impl ValuationProvider for SuperCarAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::SuperCar
    }

    fn request_url(&self, vrm: &Vrm, mileage: u32) -> String {
        format!(
            "{}/valuations/{}?mileage={mileage}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(vrm.as_str()),
        )
    }

    fn fetch<'a>(
        &'a self,
        vrm: &'a Vrm,
        mileage: u32,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedValuation, ProviderError>> + Send + 'a>> {
        Box::pin(self.fetch_valuation(vrm, mileage))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SuperCarResponse {
    valuation: SuperCarValuationBody,
}

#[derive(Debug, Clone, Deserialize)]
struct SuperCarValuationBody {
    #[serde(rename = "lowerValue")]
    lower_value: f64,
    #[serde(rename = "upperValue")]
    upper_value: f64,
}
