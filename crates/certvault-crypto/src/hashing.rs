//! Canonical certificate content hashing.
//!
//! The digest is a pure function of the immutable content fields plus the
//! owner and issuer ids. Dates are normalized to ISO-8601 calendar form and
//! metadata to sorted-key compact JSON before hashing, so the same logical
//! content hashes identically on every platform and locale.

use subtle::ConstantTimeEq;

use certvault_core::CertificateContent;

use crate::error::CryptoError;

/// A 32-byte BLAKE3 certificate digest, hex-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CertificateHash([u8; 32]);

impl CertificateHash {
    /// Parse a 64-char lowercase hex digest.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidDigest(format!("expected 32 bytes, got {}", s.len() / 2)))?;
        Ok(Self(arr))
    }

    /// Hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Constant-time equality against another digest.
    ///
    /// Hash-gated lookups compare digests with this rather than `==` so the
    /// comparison leaks no timing information about the stored value.
    pub fn ct_eq(&self, other: &CertificateHash) -> bool {
        self.0.ct_eq(&other.0).into()
    }

    /// Constant-time equality against a hex string; a malformed string
    /// compares unequal.
    pub fn ct_eq_hex(&self, hex_digest: &str) -> bool {
        match Self::from_hex(hex_digest) {
            Ok(other) => self.ct_eq(&other),
            Err(_) => false,
        }
    }
}

impl std::fmt::Display for CertificateHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Canonical byte encoding of certificate content.
///
/// Fields are emitted in a fixed order, each prefixed with its u64
/// little-endian length, so adjacent fields can never be confused for one
/// another ("ab" + "c" vs "a" + "bc"). Absent optional fields contribute
/// nothing, which keeps a missing expiration distinct from an empty one.
pub fn canonical_content_bytes(content: &CertificateContent) -> Vec<u8> {
    let mut out = Vec::new();

    let mut push = |field: &str| {
        out.extend_from_slice(&(field.len() as u64).to_le_bytes());
        out.extend_from_slice(field.as_bytes());
    };

    push(&content.owner_id);
    push(&content.issuer_id);
    push(&content.student_name);
    push(&content.course_name);
    push(&content.issue_date.format("%Y-%m-%d").to_string());
    if let Some(ref metadata) = content.metadata {
        push(&metadata.canonical_json());
    }
    if let Some(expiration) = content.expiration_date {
        push(&expiration.format("%Y-%m-%d").to_string());
    }

    out
}

/// Compute the certificate digest: BLAKE3 over the canonical content bytes.
pub fn compute_hash(content: &CertificateContent) -> CertificateHash {
    let digest = blake3::hash(&canonical_content_bytes(content));
    CertificateHash(*digest.as_bytes())
}
