use certvault_store::StoreError;

/// Anchoring errors. These are recovered internally by the worker's retry
/// loop and never surfaced to the issuance caller.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("ledger oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("ledger rejected submission: {0}")]
    Rejected(String),

    #[error("anchor queue closed")]
    QueueClosed,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
