//! The ledger oracle seam.
//!
//! The external ledger is opaque: it accepts a certificate hash and returns
//! a transaction hash, and can later answer whether a hash is anchored.
//! Consensus, gas, and contract mechanics live behind this trait.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AnchorError;

/// An external ledger that can anchor certificate hashes.
#[async_trait]
pub trait LedgerOracle: Send + Sync {
    /// Submit a hash for anchoring. Returns the ledger transaction hash.
    async fn submit(
        &self,
        certificate_id: &str,
        certificate_hash: &str,
    ) -> Result<String, AnchorError>;

    /// Whether the hash is present on the ledger.
    async fn is_anchored(&self, certificate_hash: &str) -> Result<bool, AnchorError>;
}

#[derive(Deserialize)]
struct SubmitResponse {
    tx_hash: String,
}

#[derive(Deserialize)]
struct AnchoredResponse {
    anchored: bool,
}

/// HTTP client for a ledger anchoring gateway.
pub struct HttpLedgerOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedgerOracle {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LedgerOracle for HttpLedgerOracle {
    async fn submit(
        &self,
        certificate_id: &str,
        certificate_hash: &str,
    ) -> Result<String, AnchorError> {
        let url = format!("{}/anchors", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "certificate_id": certificate_id,
                "certificate_hash": certificate_hash,
            }))
            .send()
            .await
            .map_err(|e| AnchorError::OracleUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnchorError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| AnchorError::Rejected(format!("malformed response: {}", e)))?;
        Ok(body.tx_hash)
    }

    async fn is_anchored(&self, certificate_hash: &str) -> Result<bool, AnchorError> {
        let url = format!("{}/anchors/{}", self.base_url, certificate_hash);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AnchorError::OracleUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(AnchorError::OracleUnavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let body: AnchoredResponse = response
            .json()
            .await
            .map_err(|e| AnchorError::OracleUnavailable(format!("malformed response: {}", e)))?;
        Ok(body.anchored)
    }
}

/// In-process ledger stand-in.
///
/// Used when no anchoring gateway is configured (development deployments)
/// and by tests that need a scriptable failure sequence.
pub struct MockLedger {
    fail_first: AtomicUsize,
    submissions: AtomicUsize,
}

impl MockLedger {
    /// A ledger that accepts every submission.
    pub fn new() -> Self {
        Self {
            fail_first: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        }
    }

    /// A ledger that fails the first `n` submissions, then accepts.
    pub fn failing(n: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(n),
            submissions: AtomicUsize::new(0),
        }
    }

    /// Total submission attempts observed.
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerOracle for MockLedger {
    async fn submit(
        &self,
        _certificate_id: &str,
        certificate_hash: &str,
    ) -> Result<String, AnchorError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(AnchorError::OracleUnavailable("scripted failure".into()));
        }

        // Deterministic pseudo-tx-hash derived from the submitted digest.
        let prefix: String = certificate_hash.chars().take(16).collect();
        Ok(format!("0xmock{}", prefix))
    }

    async fn is_anchored(&self, _certificate_hash: &str) -> Result<bool, AnchorError> {
        Ok(self.fail_first.load(Ordering::SeqCst) == 0)
    }
}
