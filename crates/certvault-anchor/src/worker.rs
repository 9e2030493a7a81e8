//! The anchoring worker: pulls jobs from a durable queue and submits
//! certificate hashes to the ledger oracle with bounded, jittered retries.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use certvault_core::AnchorStatus;
use certvault_store::{AnchorJob, AnchorQueueStore, CertificateStore};

use crate::error::AnchorError;
use crate::oracle::LedgerOracle;

/// Retry policy for ledger submissions.
#[derive(Debug, Clone)]
pub struct AnchorPolicy {
    /// Submission attempts per job before the record is marked failed.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Handle for feeding the worker. Held by the issuance path.
#[derive(Clone)]
pub struct AnchorService {
    tx: mpsc::Sender<AnchorJob>,
    queue: Arc<AnchorQueueStore>,
    store: Arc<CertificateStore>,
}

impl AnchorService {
    /// Queue a certificate for anchoring.
    ///
    /// Durable first, channel second: a crash between the two is recovered
    /// by the worker's startup scan. Enqueueing an already-queued
    /// certificate is a no-op.
    pub async fn enqueue(
        &self,
        certificate_id: &str,
        certificate_hash: &str,
    ) -> Result<(), AnchorError> {
        if !self.queue.enqueue(certificate_id, certificate_hash)? {
            tracing::debug!(certificate_id, "already queued for anchoring");
            return Ok(());
        }

        let job = AnchorJob {
            certificate_id: certificate_id.to_string(),
            certificate_hash: certificate_hash.to_string(),
            enqueued_at: chrono::Utc::now(),
        };
        self.tx.send(job).await.map_err(|_| AnchorError::QueueClosed)
    }

    /// Re-queue a certificate whose anchoring previously failed.
    ///
    /// Moves the record `Failed → Pending` and hands it back to the worker;
    /// the inverse of retry exhaustion.
    pub async fn resubmit(&self, certificate_id: &str) -> Result<(), AnchorError> {
        let cert = self
            .store
            .update_anchor_status(certificate_id, AnchorStatus::Pending, None)
            .await?;
        self.enqueue(&cert.certificate_id, &cert.certificate_hash)
            .await
    }
}

/// Background task that drains the anchor queue.
pub struct AnchorWorker {
    store: Arc<CertificateStore>,
    queue: Arc<AnchorQueueStore>,
    oracle: Arc<dyn LedgerOracle>,
    policy: AnchorPolicy,
    rx: mpsc::Receiver<AnchorJob>,
}

impl AnchorWorker {
    /// Build a worker and its service handle.
    pub fn new(
        store: Arc<CertificateStore>,
        queue: Arc<AnchorQueueStore>,
        oracle: Arc<dyn LedgerOracle>,
        policy: AnchorPolicy,
    ) -> (Self, AnchorService) {
        let (tx, rx) = mpsc::channel(256);
        let service = AnchorService {
            tx,
            queue: queue.clone(),
            store: store.clone(),
        };
        let worker = Self {
            store,
            queue,
            oracle,
            policy,
            rx,
        };
        (worker, service)
    }

    /// Run the worker until the service handle is dropped.
    ///
    /// Jobs left in the durable queue by a previous process run first.
    pub async fn run(mut self) {
        match self.queue.pending_jobs() {
            Ok(jobs) => {
                if !jobs.is_empty() {
                    tracing::info!(count = jobs.len(), "recovering queued anchor jobs");
                }
                for job in jobs {
                    self.process(job).await;
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to scan anchor queue at startup"),
        }

        while let Some(job) = self.rx.recv().await {
            self.process(job).await;
        }
        tracing::info!("anchor queue closed, worker exiting");
    }

    /// Process one job to completion: confirmed, or failed after bounded
    /// retries. One job is in flight at a time, so per-certificate attempts
    /// never overlap.
    async fn process(&self, job: AnchorJob) {
        // A record can reach the channel twice across restarts; only
        // pending records are submitted.
        match self.store.get(&job.certificate_id) {
            Ok(cert) if cert.anchor_status == AnchorStatus::Pending => {}
            Ok(cert) => {
                tracing::debug!(
                    certificate_id = %job.certificate_id,
                    status = %cert.anchor_status,
                    "skipping non-pending anchor job"
                );
                self.queue.remove(&job.certificate_id).ok();
                return;
            }
            Err(e) => {
                tracing::warn!(
                    certificate_id = %job.certificate_id,
                    error = %e,
                    "dropping anchor job for unknown certificate"
                );
                self.queue.remove(&job.certificate_id).ok();
                return;
            }
        }

        let outcome = self.submit_with_retries(&job).await;

        let write = match outcome {
            Ok(tx_hash) => {
                tracing::info!(
                    certificate_id = %job.certificate_id,
                    tx_hash = %tx_hash,
                    "certificate anchored"
                );
                self.store
                    .update_anchor_status(&job.certificate_id, AnchorStatus::Confirmed, Some(tx_hash))
                    .await
            }
            Err(e) => {
                tracing::warn!(
                    certificate_id = %job.certificate_id,
                    attempts = self.policy.max_attempts,
                    error = %e,
                    "anchoring retries exhausted"
                );
                self.store
                    .update_anchor_status(&job.certificate_id, AnchorStatus::Failed, None)
                    .await
            }
        };

        if let Err(e) = write {
            tracing::error!(
                certificate_id = %job.certificate_id,
                error = %e,
                "failed to write anchor status"
            );
        }
        self.queue.remove(&job.certificate_id).ok();
    }

    async fn submit_with_retries(&self, job: &AnchorJob) -> Result<String, AnchorError> {
        let mut last_err = AnchorError::OracleUnavailable("no attempts made".into());

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                tracing::debug!(
                    certificate_id = %job.certificate_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying ledger submission after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            match self
                .oracle
                .submit(&job.certificate_id, &job.certificate_hash)
                .await
            {
                Ok(tx_hash) => return Ok(tx_hash),
                Err(e) => {
                    tracing::debug!(
                        certificate_id = %job.certificate_id,
                        attempt,
                        error = %e,
                        "ledger submission failed"
                    );
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    /// Exponential backoff with jitter in [0.5, 1.5) of the nominal delay,
    /// capped at the policy maximum.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .policy
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt - 1));
        let capped = exp.min(self.policy.max_delay);
        capped.mul_f64(rand::thread_rng().gen_range(0.5..1.5))
    }
}
