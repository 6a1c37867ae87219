use serde::{Deserialize, Serialize};

use crate::domain::Vrm;
use crate::provider::ProviderId;
use crate::ValidationError;

/// Canonical vehicle valuation, immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub vrm: Vrm,
    pub lowest_value: f64,
    pub highest_value: f64,
    pub provider: ProviderId,
}

impl Valuation {
    /// Build a valuation, rejecting non-finite, negative, or inverted bounds.
    /// NaN from a sloppy upstream payload fails here rather than being stored.
    pub fn new(
        vrm: Vrm,
        lowest_value: f64,
        highest_value: f64,
        provider: ProviderId,
    ) -> Result<Self, ValidationError> {
        if !lowest_value.is_finite() || lowest_value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "lowest_value",
            });
        }
        if !highest_value.is_finite() || highest_value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "highest_value",
            });
        }
        if highest_value < lowest_value {
            return Err(ValidationError::InvalidValueRange);
        }

        Ok(Self {
            vrm,
            lowest_value,
            highest_value,
            provider,
        })
    }
}
