//! Share-link records, keyed by token.
//!
//! Links hold a non-owning `certificate_id` reference: a link to a missing
//! certificate is simply unresolvable, never a cascade.

use std::sync::Arc;

use certvault_core::ShareLink;

use crate::db::{Database, CF_SHARE_LINKS};
use crate::error::StoreError;

pub struct ShareLinkStore {
    db: Arc<Database>,
}

impl ShareLinkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist a share link.
    pub fn put(&self, link: &ShareLink) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(link)?;
        self.db
            .put(CF_SHARE_LINKS, link.link_token.as_bytes(), &encoded)
    }

    /// Fetch a share link by token.
    pub fn get(&self, link_token: &str) -> Result<ShareLink, StoreError> {
        match self.db.get(CF_SHARE_LINKS, link_token.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("share link record: {}", e))),
            None => Err(StoreError::NotFound(format!("share link {}", link_token))),
        }
    }

    /// Administratively revoke a link. Idempotent.
    pub fn revoke(&self, link_token: &str) -> Result<ShareLink, StoreError> {
        let mut link = self.get(link_token)?;
        if !link.revoked {
            link.revoked = true;
            self.put(&link)?;
            tracing::info!(link_token = %link_token, "share link revoked");
        }
        Ok(link)
    }

    /// Record one successful resolution of the link.
    pub fn record_access(&self, link_token: &str) -> Result<ShareLink, StoreError> {
        let mut link = self.get(link_token)?;
        link.access_count += 1;
        self.put(&link)?;
        Ok(link)
    }
}
