//! Domain models for vehicle valuations.

mod models;
mod vrm;

pub use models::Valuation;
pub use vrm::Vrm;
