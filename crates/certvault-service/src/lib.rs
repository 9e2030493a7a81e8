//! CertVault domain services — the authorization gate, certificate
//! issuance and revocation, share-link management, and verification.

pub mod authz;
pub mod error;
pub mod issuer;
pub mod share;
pub mod verify;

pub use authz::AuthorizationGate;
pub use error::ServiceError;
pub use issuer::{CertificateIssuer, CertificateView, IssueRequest};
pub use share::{ShareLinkManager, SharePolicy};
pub use verify::{VerificationEngine, VerificationReport, VerifyRequest};
