//! The CertVault node orchestrator.
//!
//! Wires storage, domain services, the anchoring worker, and the HTTP API
//! together. The worker runs as a background task; the HTTP server is the
//! foreground loop.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use certvault_anchor::{
    AnchorPolicy, AnchorWorker, HttpLedgerOracle, LedgerOracle, MockLedger,
};
use certvault_service::{
    CertificateIssuer, ShareLinkManager, SharePolicy, VerificationEngine,
};
use certvault_store::{
    AnchorQueueStore, CertificateStore, Database, ShareLinkStore, UserDirectory,
};

use crate::api::AppState;
use crate::config::CertVaultConfig;

pub struct CertVaultNode {
    config: CertVaultConfig,
    state: Option<Arc<AppState>>,
    worker_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CertVaultNode {
    pub fn new(config: CertVaultConfig) -> Self {
        Self {
            config,
            state: None,
            worker_handle: None,
        }
    }

    /// Initialize storage and services and spawn the anchoring worker.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting CertVault node");

        let db = Arc::new(Database::open(&self.config.storage.data_dir)?);
        tracing::info!(path = %self.config.storage.data_dir.display(), "storage initialized");

        let certificates = Arc::new(CertificateStore::new(db.clone()));
        let share_links = Arc::new(ShareLinkStore::new(db.clone()));
        let directory = Arc::new(UserDirectory::new(db.clone()));
        let anchor_queue = Arc::new(AnchorQueueStore::new(db));

        let oracle: Arc<dyn LedgerOracle> = match self.config.anchoring.endpoint {
            Some(ref endpoint) => {
                tracing::info!(%endpoint, "using HTTP ledger oracle");
                Arc::new(HttpLedgerOracle::new(endpoint.clone()))
            }
            None => {
                tracing::warn!("no anchoring endpoint configured, using in-process mock ledger");
                Arc::new(MockLedger::new())
            }
        };

        let policy = AnchorPolicy {
            max_attempts: self.config.anchoring.max_attempts,
            base_delay: Duration::from_millis(self.config.anchoring.base_delay_ms),
            max_delay: Duration::from_millis(self.config.anchoring.max_delay_ms),
        };
        let (worker, anchor_service) =
            AnchorWorker::new(certificates.clone(), anchor_queue, oracle, policy);

        self.worker_handle = Some(tokio::spawn(async move {
            worker.run().await;
        }));
        tracing::info!("anchoring worker started");

        let shares = Arc::new(ShareLinkManager::new(
            share_links,
            certificates.clone(),
            SharePolicy {
                max_days: self.config.sharing.max_share_days,
            },
        ));
        let issuer = Arc::new(CertificateIssuer::new(
            certificates.clone(),
            directory.clone(),
            anchor_service,
        ));
        let engine = Arc::new(VerificationEngine::new(certificates, shares.clone()));

        self.state = Some(Arc::new(AppState {
            directory,
            issuer,
            shares,
            engine,
            jwt_secret: self.config.auth.jwt_secret.clone(),
            token_ttl_hours: self.config.auth.token_ttl_hours,
        }));

        Ok(())
    }

    /// Serve the HTTP API until the task is cancelled.
    pub async fn run(&self) -> Result<()> {
        let state = self
            .state
            .clone()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        let api_addr: SocketAddr =
            format!("{}:{}", self.config.api.listen_addr, self.config.api.port).parse()?;
        crate::api::start_api_server(api_addr, state).await
    }

    /// Gracefully shut down the node.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down CertVault node");

        // Dropping the state drops the anchor service senders, which lets
        // the worker drain its queue and exit.
        self.state = None;
        if let Some(handle) = self.worker_handle.take() {
            handle.await.ok();
            tracing::info!("anchoring worker stopped");
        }

        tracing::info!("CertVault node shut down");
        Ok(())
    }
}
