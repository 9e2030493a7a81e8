/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}
