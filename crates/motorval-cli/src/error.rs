use thiserror::Error;

use motorval_core::{ServiceError, StoreError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no valuation available: {0}")]
    Unavailable(String),

    #[error("no valuation stored for {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Service(ServiceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Unavailable(_) => 3,
            Self::NotFound(_) => 4,
            Self::Store(_) | Self::Service(_) => 5,
            Self::Serialization(_) => 6,
            Self::Io(_) => 10,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Unavailable { vrm, reason } => {
                Self::Unavailable(format!("{vrm}: {reason}"))
            }
            ServiceError::Store(store) => Self::Store(store),
            other => Self::Service(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_failure_classes() {
        assert_eq!(CliError::Validation(ValidationError::EmptyVrm).exit_code(), 2);
        assert_eq!(CliError::Unavailable("AB12CDE".into()).exit_code(), 3);
        assert_eq!(CliError::NotFound("AB12CDE".into()).exit_code(), 4);
    }
}
