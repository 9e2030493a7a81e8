use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::anchor_state::AnchorStatus;
use crate::error::CoreError;
use crate::metadata::MetadataValue;

/// Generate a fresh certificate identifier (UUID v7, time-ordered).
pub fn new_certificate_id() -> String {
    Uuid::now_v7().to_string()
}

/// Generate a fresh user identifier.
pub fn new_user_id() -> String {
    Uuid::now_v7().to_string()
}

/// Account role, set at registration and authoritative for every
/// capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account; may own certificates and share them.
    User,
    /// Privileged account; may mint and revoke certificates.
    Issuer,
}

impl Role {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "user" => Ok(Self::User),
            "issuer" => Ok(Self::Issuer),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Issuer => write!(f, "issuer"),
        }
    }
}

/// A registered account in the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The immutable content of a certificate: exactly the fields the
/// integrity hash is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateContent {
    pub owner_id: String,
    pub issuer_id: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub metadata: Option<MetadataValue>,
}

/// One issued credential.
///
/// Content fields are immutable after creation; lifecycle flags
/// (`is_revoked`, anchor status) are the only mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// Globally unique, assigned once at creation.
    pub certificate_id: String,
    /// The subject of the certificate.
    pub owner_id: String,
    /// The minting authority.
    pub issuer_id: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub metadata: Option<MetadataValue>,
    /// Content digest, computed once at creation and never recomputed.
    pub certificate_hash: String,
    /// Monotonic: false → true only.
    pub is_revoked: bool,
    pub anchor_status: AnchorStatus,
    pub anchor_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Reassemble the hash-input content from the stored record.
    pub fn content(&self) -> CertificateContent {
        CertificateContent {
            owner_id: self.owner_id.clone(),
            issuer_id: self.issuer_id.clone(),
            student_name: self.student_name.clone(),
            course_name: self.course_name.clone(),
            issue_date: self.issue_date,
            expiration_date: self.expiration_date,
            metadata: self.metadata.clone(),
        }
    }

    /// The reduced view served to anonymous verification queries.
    ///
    /// Carries no metadata document; owner and issuer ids stay because
    /// they are part of the hash input a relying party may recompute.
    pub fn public_view(&self) -> PublicCertificate {
        PublicCertificate {
            certificate_id: self.certificate_id.clone(),
            owner_id: self.owner_id.clone(),
            issuer_id: self.issuer_id.clone(),
            student_name: self.student_name.clone(),
            course_name: self.course_name.clone(),
            issue_date: self.issue_date,
            expiration_date: self.expiration_date,
            certificate_hash: self.certificate_hash.clone(),
            is_revoked: self.is_revoked,
            anchor_status: self.anchor_status,
            anchor_tx_hash: self.anchor_tx_hash.clone(),
        }
    }
}

/// Public (metadata-free) projection of a certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicCertificate {
    pub certificate_id: String,
    pub owner_id: String,
    pub issuer_id: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub certificate_hash: String,
    pub is_revoked: bool,
    pub anchor_status: AnchorStatus,
    pub anchor_tx_hash: Option<String>,
}

/// A bearer capability granting read-only, time-boxed access to exactly
/// one certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    /// Unguessable token; the link's identity.
    pub link_token: String,
    /// The scoped resource (non-owning reference).
    pub certificate_id: String,
    /// Owner of the certificate at creation time.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Administrative revocation, independent of the certificate's own
    /// revocation.
    pub revoked: bool,
    pub access_count: u64,
}

impl ShareLink {
    /// Whether the link's validity window has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
