//! Certificate issuance, revocation, and views.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use certvault_anchor::AnchorService;
use certvault_core::{Certificate, CertificateContent, MetadataValue, PublicCertificate, User};
use certvault_crypto::compute_hash;
use certvault_store::{CertificateStore, UserDirectory};

use crate::authz::AuthorizationGate;
use crate::error::ServiceError;

/// Dates cross the API as ISO-8601 calendar strings.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Request to mint a certificate.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub owner_id: String,
    pub student_name: String,
    pub course_name: String,
    /// `YYYY-MM-DD`; defaults to today.
    pub issue_date: Option<String>,
    /// `YYYY-MM-DD`.
    pub expiration_date: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A certificate as served to a particular caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CertificateView {
    /// Owner or issuer of record: the complete record.
    Full(Certificate),
    /// Everyone else: the metadata-free projection.
    Public(PublicCertificate),
}

/// Mints and revokes certificates; the only writer of certificate content.
pub struct CertificateIssuer {
    store: Arc<CertificateStore>,
    directory: Arc<UserDirectory>,
    anchor: AnchorService,
}

impl CertificateIssuer {
    pub fn new(
        store: Arc<CertificateStore>,
        directory: Arc<UserDirectory>,
        anchor: AnchorService,
    ) -> Self {
        Self {
            store,
            directory,
            anchor,
        }
    }

    /// Issue a certificate.
    ///
    /// The caller must hold the issuer role and becomes the issuer of
    /// record. The content hash is computed here, once; anchoring is queued
    /// as a side effect and its outcome never reaches this caller.
    pub async fn issue(
        &self,
        caller: &User,
        request: IssueRequest,
    ) -> Result<Certificate, ServiceError> {
        AuthorizationGate::require_issuer(caller)?;

        if request.student_name.trim().is_empty() {
            return Err(ServiceError::Validation("student_name is required".into()));
        }
        if request.course_name.trim().is_empty() {
            return Err(ServiceError::Validation("course_name is required".into()));
        }

        // The owner must exist before a certificate can reference them.
        self.directory
            .get(&request.owner_id)
            .map_err(|_| ServiceError::NotFound(format!("owner {}", request.owner_id)))?;

        let issue_date = match request.issue_date {
            Some(ref s) => parse_date(s)?,
            None => Utc::now().date_naive(),
        };
        let expiration_date = request
            .expiration_date
            .as_deref()
            .map(parse_date)
            .transpose()?;

        if let Some(expiration) = expiration_date {
            if expiration <= issue_date {
                return Err(ServiceError::Validation(
                    "expiration_date must be after issue_date".into(),
                ));
            }
        }

        let metadata = request
            .metadata
            .as_ref()
            .map(MetadataValue::from_json)
            .transpose()?;

        let content = CertificateContent {
            owner_id: request.owner_id,
            issuer_id: caller.id.clone(),
            student_name: request.student_name,
            course_name: request.course_name,
            issue_date,
            expiration_date,
            metadata,
        };

        let certificate_hash = compute_hash(&content).to_hex();
        let cert = self.store.create(content, &certificate_hash).await?;

        // Best-effort: anchoring runs behind the worker's retry loop and a
        // queue failure must not fail the issuance.
        if let Err(e) = self
            .anchor
            .enqueue(&cert.certificate_id, &cert.certificate_hash)
            .await
        {
            tracing::warn!(
                certificate_id = %cert.certificate_id,
                error = %e,
                "could not queue certificate for anchoring"
            );
        }

        tracing::info!(
            certificate_id = %cert.certificate_id,
            issuer_id = %caller.id,
            owner_id = %cert.owner_id,
            course = %cert.course_name,
            "certificate issued"
        );

        Ok(cert)
    }

    /// Revoke a certificate. Only the issuer of record may revoke, and
    /// revocation is idempotent and permanent.
    pub async fn revoke(
        &self,
        caller: &User,
        certificate_id: &str,
    ) -> Result<Certificate, ServiceError> {
        let cert = self.store.get(certificate_id)?;
        AuthorizationGate::require_issuer_of_record(caller, &cert)?;

        let revoked = self.store.mark_revoked(certificate_id).await?;
        tracing::info!(
            certificate_id = %certificate_id,
            issuer_id = %caller.id,
            "certificate revoked by issuer"
        );
        Ok(revoked)
    }

    /// Certificates owned by the caller.
    pub fn list_owned(&self, caller: &User) -> Result<Vec<Certificate>, ServiceError> {
        Ok(self.store.list_by_owner(&caller.id)?)
    }

    /// Certificates minted by the caller; issuer role required.
    pub fn list_issued(&self, caller: &User) -> Result<Vec<Certificate>, ServiceError> {
        AuthorizationGate::require_issuer(caller)?;
        Ok(self.store.list_by_issuer(&caller.id)?)
    }

    /// Fetch a certificate as seen by `caller`: the full record for the
    /// owner and issuer of record, the public projection for anyone else
    /// (including anonymous callers).
    pub fn view(
        &self,
        caller: Option<&User>,
        certificate_id: &str,
    ) -> Result<CertificateView, ServiceError> {
        let cert = self.store.get(certificate_id)?;
        match caller {
            Some(user) if AuthorizationGate::can_view_full(user, &cert) => {
                Ok(CertificateView::Full(cert))
            }
            _ => Ok(CertificateView::Public(cert.public_view())),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| ServiceError::Validation(format!("invalid date '{}', expected YYYY-MM-DD", s)))
}
