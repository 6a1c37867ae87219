//! # Motorval Core
//!
//! Core contracts and failover orchestration for the Motorval vehicle
//! valuation toolkit.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Motorval:
//!
//! - **Canonical domain models** for VRMs and valuations
//! - **Provider adapters** for the Super Car (JSON) and Premium Car (XML)
//!   upstreams
//! - **Circuit breaker** guarding the primary upstream with a rolling
//!   error-percentage window
//! - **Failover controller** that tries the primary, then the secondary
//! - **Store-first orchestrator** making valuations idempotent per VRM
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Super Car, Premium Car) |
//! | [`call_log`] | Per-invocation provider log persistence |
//! | [`circuit_breaker`] | Rolling-window circuit breaker |
//! | [`config`] | Environment-driven service configuration |
//! | [`domain`] | Domain models (Vrm, Valuation) |
//! | [`error`] | Validation errors |
//! | [`failover`] | Primary/secondary failover controller |
//! | [`http_client`] | HTTP client abstraction |
//! | [`orchestrator`] | Store-first valuation service |
//! | [`provider`] | Provider identifiers, errors, and adapter contract |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use motorval_core::{ServiceConfig, ValuationService, Vrm};
//! use motorval_store::ValuationStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ValuationStore::open_default()?;
//!     let service = ValuationService::from_config(store, &ServiceConfig::from_env());
//!
//!     let vrm = Vrm::parse("AB12CDE")?;
//!     let valuation = service.fetch_or_create(&vrm, 10_000).await?;
//!     println!("{} - {}", valuation.lowest_value, valuation.highest_value);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod call_log;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod failover;
pub mod http_client;
pub mod orchestrator;
pub mod provider;

pub use adapters::{PremiumCarAdapter, SuperCarAdapter};
pub use call_log::CallLogger;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::ServiceConfig;
pub use domain::{Valuation, Vrm};
pub use error::ValidationError;
pub use failover::{CallAttempt, FailoverFailure, FailoverSuccess, FailoverValuer};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use orchestrator::{ServiceError, ValuationService};
pub use provider::{
    FetchedValuation, ProviderError, ProviderErrorKind, ProviderId, ValuationProvider,
};

// Store types are re-exported so callers rarely need a direct
// motorval-store dependency.
pub use motorval_store::{ProviderLogRow, StoreConfig, StoreError, ValuationRow, ValuationStore};
