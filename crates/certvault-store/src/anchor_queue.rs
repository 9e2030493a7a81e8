//! Durable queue of pending anchoring jobs, keyed by certificate id.
//!
//! The key scheme makes duplicate enqueue for the same certificate a
//! natural no-op, and a startup scan recovers jobs that were pending when
//! the process last stopped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, CF_ANCHOR_QUEUE};
use crate::error::StoreError;

/// One pending anchoring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorJob {
    pub certificate_id: String,
    pub certificate_hash: String,
    pub enqueued_at: DateTime<Utc>,
}

pub struct AnchorQueueStore {
    db: Arc<Database>,
}

impl AnchorQueueStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist a job. Returns `false` (without writing) when the
    /// certificate is already queued.
    pub fn enqueue(&self, certificate_id: &str, certificate_hash: &str) -> Result<bool, StoreError> {
        if self
            .db
            .get(CF_ANCHOR_QUEUE, certificate_id.as_bytes())?
            .is_some()
        {
            return Ok(false);
        }

        let job = AnchorJob {
            certificate_id: certificate_id.to_string(),
            certificate_hash: certificate_hash.to_string(),
            enqueued_at: Utc::now(),
        };
        self.db.put(
            CF_ANCHOR_QUEUE,
            certificate_id.as_bytes(),
            &serde_json::to_vec(&job)?,
        )?;
        Ok(true)
    }

    /// Remove a completed (or exhausted) job.
    pub fn remove(&self, certificate_id: &str) -> Result<(), StoreError> {
        self.db.delete(CF_ANCHOR_QUEUE, certificate_id.as_bytes())
    }

    /// All jobs still pending, oldest key order first.
    pub fn pending_jobs(&self) -> Result<Vec<AnchorJob>, StoreError> {
        let pairs = self.db.scan_all(CF_ANCHOR_QUEUE)?;
        pairs
            .iter()
            .map(|(_, bytes)| {
                serde_json::from_slice(bytes)
                    .map_err(|e| StoreError::Corrupt(format!("anchor job record: {}", e)))
            })
            .collect()
    }
}
