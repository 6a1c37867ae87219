use thiserror::Error;

/// Validation and contract errors exposed by `motorval-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("vrm cannot be empty")]
    EmptyVrm,
    #[error("vrm length {len} exceeds max {max}")]
    VrmTooLong { len: usize, max: usize },
    #[error("vrm contains invalid character '{ch}' at index {index}")]
    VrmInvalidChar { ch: char, index: usize },

    #[error("mileage must be a positive number")]
    MileageNotPositive,

    #[error("invalid provider '{value}', expected one of super_car, premium_car")]
    InvalidProvider { value: String },

    #[error("field '{field}' must be a finite, non-negative number")]
    InvalidValue { field: &'static str },
    #[error("highest value must be >= lowest value")]
    InvalidValueRange,
}
