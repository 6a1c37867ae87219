use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::{Valuation, Vrm};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{FetchedValuation, ProviderError, ProviderId, ValuationProvider};

const DEALERSHIP_MINIMUM: &str = "ValuationDealershipMinimum";
const DEALERSHIP_MAXIMUM: &str = "ValuationDealershipMaximum";

/// Premium Car Valuations adapter, the failover upstream. Answers a flat XML
/// document of labeled value nodes; the two dealership bounds are located by
/// name and coerced to numbers, failing closed when absent or non-numeric.
#[derive(Clone)]
pub struct PremiumCarAdapter {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    request_timeout_ms: u64,
}

impl PremiumCarAdapter {
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
                    "premium car valuations transport error: {}",
                    error.message()
                ))
            }
        })?;

        if !response.is_success() {
            return Err(ProviderError::status(
                ProviderId::PremiumCar,
                response.status,
            ));
        }

        let lowest_value = numeric_field(&response.body, DEALERSHIP_MINIMUM)?;
        let highest_value = numeric_field(&response.body, DEALERSHIP_MAXIMUM)?;

        let valuation = Valuation::new(
            vrm.clone(),
            lowest_value,
            highest_value,
            ProviderId::PremiumCar,
        )
        .map_err(|error| ProviderError::malformed(error.to_string()))?;

        Ok(FetchedValuation {
            valuation,
            status_code: response.status,
        })
    }
}

impl ValuationProvider for PremiumCarAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::PremiumCar
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

/// Extract a named field and coerce it to a finite number. A missing node,
/// empty text, or unparseable content is a malformed-payload error, never a
/// silently propagated NaN.
fn numeric_field(body: &str, name: &str) -> Result<f64, ProviderError> {
    let text = field_text(body, name).ok_or_else(|| {
        ProviderError::malformed(format!(
            "premium car valuations response is missing '{name}'"
        ))
    })?;

    let value = text.trim().parse::<f64>().map_err(|_| {
        ProviderError::malformed(format!(
            "premium car valuations field '{name}' is not numeric: '{text}'"
        ))
    })?;

    if !value.is_finite() {
        return Err(ProviderError::malformed(format!(
            "premium car valuations field '{name}' is not a finite number: '{text}'"
        )));
    }
    Ok(value)
}

/// Find the text content of the first element named `name` anywhere in the
/// document. The upstream format is a flat list of labeled nodes under a
/// single root, so depth does not matter.
fn field_text(body: &str, name: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut inside_target = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                inside_target = start.name().as_ref() == name.as_bytes();
            }
            Ok(Event::Text(text)) if inside_target => {
                return text.unescape().ok().map(|content| content.into_owned());
            }
            Ok(Event::End(_)) => {
                if inside_target {
                    // Target element closed without text content.
                    return None;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
