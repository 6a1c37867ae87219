use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Valuation, Vrm};
use crate::ValidationError;

/// Canonical provider identifiers. `SuperCar` is the preferred upstream;
/// `PremiumCar` is the failover target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    SuperCar,
    PremiumCar,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperCar => "super_car",
            Self::PremiumCar => "premium_car",
        }
    }

    /// Human-readable name, also the label persisted alongside valuations
    /// and provider logs.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SuperCar => "Super Car Valuations",
            Self::PremiumCar => "Premium Car Valuations",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "super_car" | "Super Car Valuations" => Ok(Self::SuperCar),
            "premium_car" | "Premium Car Valuations" => Ok(Self::PremiumCar),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

/// Upstream failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection failed or the response body could not be read.
    Transport,
    /// The call exceeded the per-call timeout.
    Timeout,
    /// The provider answered with a non-2xx status.
    Status,
    /// The response body did not decode into a valuation.
    MalformedPayload,
}

/// Structured provider error consumed by the failover controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    status_code: Option<u16>,
    message: String,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transport,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn timed_out(limit: Duration) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            status_code: None,
            message: format!("call exceeded {}ms timeout", limit.as_millis()),
        }
    }

    pub fn status(provider: ProviderId, status_code: u16) -> Self {
        Self {
            kind: ProviderErrorKind::Status,
            status_code: Some(status_code),
            message: format!("{} returned status {status_code}", provider.display_name()),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::MalformedPayload,
            status_code: None,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub const fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

/// A decoded valuation together with the HTTP status the upstream answered
/// with, so call logs record the real code rather than assuming 200.
#[derive(Debug, Clone)]
pub struct FetchedValuation {
    pub valuation: Valuation,
    pub status_code: u16,
}

/// Provider adapter contract. Adapters convert a single upstream response
/// into a canonical [`Valuation`]; they never log or persist.
pub trait ValuationProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// The URL a `fetch` for these arguments would request, exposed so the
    /// caller can record it per attempt.
    fn request_url(&self, vrm: &Vrm, mileage: u32) -> String;

    fn fetch<'a>(
        &'a self,
        vrm: &'a Vrm,
        mileage: u32,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedValuation, ProviderError>> + Send + 'a>>;
}
