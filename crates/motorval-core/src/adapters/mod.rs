//! Upstream valuation provider adapters.

mod premiumcar;
mod supercar;

pub use premiumcar::PremiumCarAdapter;
pub use supercar::SuperCarAdapter;
