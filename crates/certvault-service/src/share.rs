//! Share-link issuance and resolution.
//!
//! A share link is a bearer capability scoped to exactly one certificate:
//! read access, time-boxed, never escalating to list or mutate anything
//! else.

use std::sync::Arc;

use chrono::{Duration, Utc};

use certvault_core::{Certificate, ShareLink, User};
use certvault_crypto::generate_share_token;
use certvault_store::{CertificateStore, ShareLinkStore, StoreError};

use crate::authz::AuthorizationGate;
use crate::error::ServiceError;

/// Policy limits for share links.
#[derive(Debug, Clone)]
pub struct SharePolicy {
    /// Upper bound on requested lifetimes, in days.
    pub max_days: i64,
}

impl Default for SharePolicy {
    fn default() -> Self {
        Self { max_days: 30 }
    }
}

pub struct ShareLinkManager {
    links: Arc<ShareLinkStore>,
    store: Arc<CertificateStore>,
    policy: SharePolicy,
}

impl ShareLinkManager {
    pub fn new(
        links: Arc<ShareLinkStore>,
        store: Arc<CertificateStore>,
        policy: SharePolicy,
    ) -> Self {
        Self {
            links,
            store,
            policy,
        }
    }

    /// Create a share link for a certificate the caller owns.
    ///
    /// The token comes from the CSPRNG, not from certificate content, and
    /// the lifetime is capped by policy.
    pub fn issue(
        &self,
        caller: &User,
        certificate_id: &str,
        expires_in_days: i64,
    ) -> Result<ShareLink, ServiceError> {
        if expires_in_days < 1 {
            return Err(ServiceError::Validation(
                "expires_in_days must be at least 1".into(),
            ));
        }

        let cert = self.store.get(certificate_id)?;
        AuthorizationGate::require_owner(caller, &cert)?;

        let days = expires_in_days.min(self.policy.max_days);
        let now = Utc::now();
        let link = ShareLink {
            link_token: generate_share_token(),
            certificate_id: cert.certificate_id.clone(),
            created_by: caller.id.clone(),
            created_at: now,
            expires_at: now + Duration::days(days),
            revoked: false,
            access_count: 0,
        };
        self.links.put(&link)?;

        tracing::info!(
            certificate_id = %cert.certificate_id,
            owner_id = %caller.id,
            expires_at = %link.expires_at,
            "share link created"
        );
        Ok(link)
    }

    /// Resolve a token to its certificate.
    ///
    /// Checks run in order (unknown token, administratively revoked link,
    /// expired link, missing certificate) and each failure is its own
    /// error so the caller can report precisely why access was denied. A
    /// link to a revoked certificate resolves: the revoked state must
    /// surface, not hide.
    pub fn resolve(&self, link_token: &str) -> Result<(ShareLink, Certificate), ServiceError> {
        let link = self.links.get(link_token).map_err(|e| match e {
            StoreError::NotFound(_) => ServiceError::NotFound("share link".into()),
            other => ServiceError::from(other),
        })?;

        if link.revoked {
            return Err(ServiceError::LinkRevoked);
        }
        if link.is_expired() {
            return Err(ServiceError::LinkExpired);
        }

        let cert = self.store.get(&link.certificate_id).map_err(|e| match e {
            // The referenced certificate is gone; the link is permanently
            // unresolvable.
            StoreError::NotFound(_) => ServiceError::NotFound("share link".into()),
            other => ServiceError::from(other),
        })?;

        let link = self.links.record_access(link_token)?;

        tracing::debug!(
            link_token = %link.link_token,
            certificate_id = %cert.certificate_id,
            access_count = link.access_count,
            "share link resolved"
        );
        Ok((link, cert))
    }

    /// Administratively revoke a link. Owner-only; independent of the
    /// certificate's own revocation.
    pub fn revoke(&self, caller: &User, link_token: &str) -> Result<ShareLink, ServiceError> {
        let link = self.links.get(link_token).map_err(|e| match e {
            StoreError::NotFound(_) => ServiceError::NotFound("share link".into()),
            other => ServiceError::from(other),
        })?;

        let cert = self.store.get(&link.certificate_id)?;
        AuthorizationGate::require_owner(caller, &cert)?;

        Ok(self.links.revoke(link_token)?)
    }
}
