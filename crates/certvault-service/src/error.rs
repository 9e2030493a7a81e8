use certvault_core::CoreError;
use certvault_store::StoreError;

/// Service-level errors, one variant per caller-distinguishable outcome.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("share link has expired")]
    LinkExpired,

    #[error("share link has been revoked")]
    LinkRevoked,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(what) => Self::Conflict(what),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::MissingField(field) => {
                Self::Validation(format!("missing required field: {}", field))
            }
            CoreError::InvalidDate(msg) => Self::Validation(format!("invalid date: {}", msg)),
            CoreError::UnsupportedMetadata(msg) => {
                Self::Validation(format!("unsupported metadata: {}", msg))
            }
            CoreError::InvalidRole(role) => Self::Validation(format!("invalid role: {}", role)),
            other => Self::Internal(other.to_string()),
        }
    }
}
