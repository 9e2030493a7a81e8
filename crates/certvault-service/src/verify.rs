//! The verification engine: answers "is this certificate genuine and
//! current?" by id, stored hash, raw content, or share token.
//!
//! Verification always produces a structured report. "Not found" and
//! "revoked" are normal negative answers, not failures, and each denial
//! reason gets its own message so a relying party knows exactly what it is
//! looking at.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use certvault_core::{AnchorStatus, Certificate, CertificateContent, PublicCertificate};
use certvault_crypto::{compute_hash, CertificateHash};
use certvault_store::{CertificateStore, StoreError};

use crate::error::ServiceError;
use crate::share::ShareLinkManager;

/// The lookup selector for a verification query.
#[derive(Debug, Clone, Deserialize)]
pub enum VerifyRequest {
    /// Stored certificate id.
    ById(String),
    /// Hex-encoded certificate digest.
    ByHash(String),
    /// Raw claimed content; the digest is recomputed and looked up.
    ByContent(CertificateContent),
    /// Share-link token.
    ByShareToken(String),
}

/// Outcome of a verification query.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub verified: bool,
    pub message: String,
    pub certificate: Option<PublicCertificate>,
    /// Ledger corroboration: true only for anchor-confirmed records.
    /// Verification never waits for anchoring; a pending certificate
    /// verifies on local hash equality alone.
    pub blockchain_verified: bool,
}

impl VerificationReport {
    fn negative(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            certificate: None,
            blockchain_verified: false,
        }
    }

    fn for_certificate(cert: Certificate) -> Self {
        let blockchain_verified = cert.anchor_status == AnchorStatus::Confirmed;
        if cert.is_revoked {
            Self {
                verified: false,
                message: "certificate has been revoked".into(),
                certificate: Some(cert.public_view()),
                blockchain_verified,
            }
        } else {
            Self {
                verified: true,
                message: "certificate is valid".into(),
                certificate: Some(cert.public_view()),
                blockchain_verified,
            }
        }
    }
}

pub struct VerificationEngine {
    store: Arc<CertificateStore>,
    shares: Arc<ShareLinkManager>,
}

impl VerificationEngine {
    pub fn new(store: Arc<CertificateStore>, shares: Arc<ShareLinkManager>) -> Self {
        Self { store, shares }
    }

    /// Run a verification query.
    ///
    /// Returns `Err` only for internal storage failures; every
    /// domain-level outcome, positive or negative, is a report.
    pub fn verify(&self, request: VerifyRequest) -> Result<VerificationReport, ServiceError> {
        let report = match request {
            VerifyRequest::ById(id) => match self.store.get(&id) {
                Ok(cert) => VerificationReport::for_certificate(cert),
                Err(StoreError::NotFound(_)) => {
                    VerificationReport::negative("certificate not found")
                }
                Err(e) => return Err(e.into()),
            },
            VerifyRequest::ByHash(hash) => self.verify_by_digest(&hash)?,
            VerifyRequest::ByContent(content) => {
                let digest = compute_hash(&content);
                self.verify_by_digest(&digest.to_hex())?
            }
            VerifyRequest::ByShareToken(token) => match self.shares.resolve(&token) {
                Ok((_, cert)) => VerificationReport::for_certificate(cert),
                Err(ServiceError::NotFound(_)) => {
                    VerificationReport::negative("share link not found")
                }
                Err(ServiceError::LinkExpired) => {
                    VerificationReport::negative("share link has expired")
                }
                Err(ServiceError::LinkRevoked) => {
                    VerificationReport::negative("share link has been revoked")
                }
                Err(e) => return Err(e),
            },
        };

        tracing::debug!(
            verified = report.verified,
            blockchain_verified = report.blockchain_verified,
            message = %report.message,
            "verification query answered"
        );
        Ok(report)
    }

    fn verify_by_digest(&self, hex_digest: &str) -> Result<VerificationReport, ServiceError> {
        let requested = match CertificateHash::from_hex(hex_digest) {
            Ok(h) => h,
            Err(_) => return Ok(VerificationReport::negative("malformed certificate hash")),
        };

        match self.store.get_by_hash(&requested.to_hex()) {
            // The index is string-keyed; the stored digest is re-compared in
            // constant time before the record is disclosed.
            Ok(cert) if requested.ct_eq_hex(&cert.certificate_hash) => {
                Ok(VerificationReport::for_certificate(cert))
            }
            Ok(_) => Ok(VerificationReport::negative("certificate not found")),
            Err(StoreError::NotFound(_)) => {
                Ok(VerificationReport::negative("certificate not found"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
