//! CertVault crypto — canonical certificate hashing and share-token
//! generation.

pub mod error;
pub mod hashing;
pub mod token;

pub use error::CryptoError;
pub use hashing::{canonical_content_bytes, compute_hash, CertificateHash};
pub use token::generate_share_token;
