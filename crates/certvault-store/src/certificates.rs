//! Durable certificate records with hash, owner, and issuer indexes.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rocksdb::WriteBatch;
use tokio::sync::Mutex;

use certvault_core::{
    new_certificate_id, AnchorEvent, AnchorStateMachine, AnchorStatus, Certificate,
    CertificateContent,
};

use crate::db::{Database, CF_CERTIFICATES, CF_HASH_INDEX, CF_ISSUER_INDEX, CF_OWNER_INDEX};
use crate::error::StoreError;

/// The certificate store: sole assigner of certificate ids and the only
/// writer of certificate records.
///
/// Content fields are immutable once written; there is no update-content
/// operation. Mutations (revocation, anchor status) serialize per record
/// through an async lock registry, so a revoke and an anchor write on the
/// same certificate never interleave while unrelated certificates proceed
/// concurrently.
pub struct CertificateStore {
    db: Arc<Database>,
    record_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CertificateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            record_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.record_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Certificate, StoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Corrupt(format!("certificate record: {}", e)))
    }

    fn put_record(&self, cert: &Certificate) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(cert)?;
        self.db
            .put(CF_CERTIFICATES, cert.certificate_id.as_bytes(), &encoded)
    }

    /// Create a certificate record from content and its precomputed digest.
    ///
    /// Assigns the certificate id, writes the record and all three index
    /// entries in one atomic batch, and starts the anchor lifecycle in
    /// `Pending`. A digest that already maps to a record with *different*
    /// content is a fatal integrity violation and is rejected; identical
    /// content is legal duplicate issuance and simply gains another id.
    pub async fn create(
        &self,
        content: CertificateContent,
        certificate_hash: &str,
    ) -> Result<Certificate, StoreError> {
        // Serialize creations that share a digest so the collision check
        // and the index write cannot race.
        let guard = self.lock_for(&format!("hash:{}", certificate_hash));
        let _held = guard.lock().await;

        for existing in self.find_by_hash(certificate_hash)? {
            if existing.content() != content {
                return Err(StoreError::Conflict(format!(
                    "hash collision: digest {} already maps to certificate {} with different content",
                    certificate_hash, existing.certificate_id
                )));
            }
        }

        let now = Utc::now();
        let cert = Certificate {
            certificate_id: new_certificate_id(),
            owner_id: content.owner_id,
            issuer_id: content.issuer_id,
            student_name: content.student_name,
            course_name: content.course_name,
            issue_date: content.issue_date,
            expiration_date: content.expiration_date,
            metadata: content.metadata,
            certificate_hash: certificate_hash.to_string(),
            is_revoked: false,
            anchor_status: AnchorStatus::Pending,
            anchor_tx_hash: None,
            created_at: now,
            updated_at: now,
        };

        let encoded = serde_json::to_vec(&cert)?;
        let id = cert.certificate_id.as_bytes();

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.db.cf(CF_CERTIFICATES)?, id, &encoded);
        batch.put_cf(
            &self.db.cf(CF_HASH_INDEX)?,
            format!("{}/{}", cert.certificate_hash, cert.certificate_id).as_bytes(),
            id,
        );
        batch.put_cf(
            &self.db.cf(CF_OWNER_INDEX)?,
            format!("{}/{}", cert.owner_id, cert.certificate_id).as_bytes(),
            id,
        );
        batch.put_cf(
            &self.db.cf(CF_ISSUER_INDEX)?,
            format!("{}/{}", cert.issuer_id, cert.certificate_id).as_bytes(),
            id,
        );
        self.db.write(batch)?;

        tracing::info!(
            certificate_id = %cert.certificate_id,
            certificate_hash = %cert.certificate_hash,
            owner_id = %cert.owner_id,
            issuer_id = %cert.issuer_id,
            "certificate created"
        );

        Ok(cert)
    }

    /// Fetch a certificate by id.
    pub fn get(&self, certificate_id: &str) -> Result<Certificate, StoreError> {
        match self.db.get(CF_CERTIFICATES, certificate_id.as_bytes())? {
            Some(bytes) => self.decode(&bytes),
            None => Err(StoreError::NotFound(format!(
                "certificate {}",
                certificate_id
            ))),
        }
    }

    fn find_by_hash(&self, certificate_hash: &str) -> Result<Vec<Certificate>, StoreError> {
        let prefix = format!("{}/", certificate_hash);
        let ids = self.db.scan_prefix(CF_HASH_INDEX, prefix.as_bytes())?;
        ids.iter()
            .map(|id_bytes| {
                let id = String::from_utf8_lossy(id_bytes);
                self.get(&id)
            })
            .collect()
    }

    /// Fetch the first certificate carrying the given digest.
    pub fn get_by_hash(&self, certificate_hash: &str) -> Result<Certificate, StoreError> {
        self.find_by_hash(certificate_hash)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("certificate hash {}", certificate_hash)))
    }

    /// All certificates owned by a user.
    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Certificate>, StoreError> {
        self.list_by_index(CF_OWNER_INDEX, owner_id)
    }

    /// All certificates minted by an issuer.
    pub fn list_by_issuer(&self, issuer_id: &str) -> Result<Vec<Certificate>, StoreError> {
        self.list_by_index(CF_ISSUER_INDEX, issuer_id)
    }

    fn list_by_index(&self, cf: &str, key: &str) -> Result<Vec<Certificate>, StoreError> {
        let prefix = format!("{}/", key);
        let ids = self.db.scan_prefix(cf, prefix.as_bytes())?;
        ids.iter()
            .map(|id_bytes| {
                let id = String::from_utf8_lossy(id_bytes);
                self.get(&id)
            })
            .collect()
    }

    /// Mark a certificate revoked. Idempotent: revoking an already-revoked
    /// record is a no-op, and nothing ever clears the flag.
    pub async fn mark_revoked(&self, certificate_id: &str) -> Result<Certificate, StoreError> {
        let guard = self.lock_for(certificate_id);
        let _held = guard.lock().await;

        let mut cert = self.get(certificate_id)?;
        if cert.is_revoked {
            return Ok(cert);
        }

        cert.is_revoked = true;
        cert.updated_at = Utc::now();
        self.put_record(&cert)?;

        tracing::info!(certificate_id = %cert.certificate_id, "certificate revoked");
        Ok(cert)
    }

    /// Write a new anchor status (and transaction hash, when confirming) in
    /// a single record update.
    ///
    /// The transition is validated against the anchor state machine, so a
    /// stale or duplicate worker write cannot move a record backwards.
    pub async fn update_anchor_status(
        &self,
        certificate_id: &str,
        status: AnchorStatus,
        tx_hash: Option<String>,
    ) -> Result<Certificate, StoreError> {
        let guard = self.lock_for(certificate_id);
        let _held = guard.lock().await;

        let mut cert = self.get(certificate_id)?;

        let event = match status {
            AnchorStatus::Confirmed => AnchorEvent::Confirm,
            AnchorStatus::Failed => AnchorEvent::Fail,
            AnchorStatus::Pending => AnchorEvent::Resubmit,
        };
        let new_status = AnchorStateMachine::transition(cert.anchor_status, event)?;

        cert.anchor_status = new_status;
        cert.anchor_tx_hash = match new_status {
            AnchorStatus::Confirmed => tx_hash,
            _ => None,
        };
        cert.updated_at = Utc::now();
        self.put_record(&cert)?;

        tracing::info!(
            certificate_id = %cert.certificate_id,
            status = %cert.anchor_status,
            tx_hash = ?cert.anchor_tx_hash,
            "anchor status updated"
        );
        Ok(cert)
    }
}
