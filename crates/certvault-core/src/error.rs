use crate::anchor_state::AnchorStatus;

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid anchor transition from {from} to {to}")]
    InvalidAnchorTransition {
        from: AnchorStatus,
        to: AnchorStatus,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unsupported metadata value: {0}")]
    UnsupportedMetadata(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),
}
