//! Integration test: anchoring worker end to end — creation enqueues,
//! the worker confirms or exhausts retries, failed records resubmit, and
//! verification reports ledger corroboration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use certvault_anchor::{AnchorPolicy, AnchorService, AnchorWorker, MockLedger};
use certvault_core::{AnchorStatus, Role, User};
use certvault_service::{
    CertificateIssuer, IssueRequest, ShareLinkManager, SharePolicy, VerificationEngine,
    VerifyRequest,
};
use certvault_store::{
    AnchorQueueStore, CertificateStore, Database, ShareLinkStore, UserDirectory,
};

struct Stack {
    dir: PathBuf,
    store: Arc<CertificateStore>,
    queue: Arc<AnchorQueueStore>,
    issuer_svc: CertificateIssuer,
    engine: VerificationEngine,
    anchor: AnchorService,
    worker_handle: tokio::task::JoinHandle<()>,
    ledger: Arc<MockLedger>,
    issuer: User,
    owner: User,
}

impl Stack {
    fn new(ledger: MockLedger) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "certvault-anchor-integration-{}",
            rand::random::<u64>()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let db = Arc::new(Database::open(&dir).unwrap());
        let store = Arc::new(CertificateStore::new(db.clone()));
        let links = Arc::new(ShareLinkStore::new(db.clone()));
        let queue = Arc::new(AnchorQueueStore::new(db.clone()));
        let directory = Arc::new(UserDirectory::new(db));

        let ledger = Arc::new(ledger);
        let policy = AnchorPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };
        let (worker, anchor) =
            AnchorWorker::new(store.clone(), queue.clone(), ledger.clone(), policy);
        let worker_handle = tokio::spawn(worker.run());

        let shares = Arc::new(ShareLinkManager::new(
            links,
            store.clone(),
            SharePolicy::default(),
        ));

        let issuer = directory
            .create_user("registrar", "registrar@uni.edu", Role::Issuer, "hash")
            .unwrap();
        let owner = directory
            .create_user("alice", "alice@example.com", Role::User, "hash")
            .unwrap();

        Self {
            dir,
            store: store.clone(),
            queue,
            issuer_svc: CertificateIssuer::new(store.clone(), directory, anchor.clone()),
            engine: VerificationEngine::new(store, shares),
            anchor,
            worker_handle,
            ledger,
            issuer,
            owner,
        }
    }

    async fn issue(&self, course: &str) -> certvault_core::Certificate {
        self.issuer_svc
            .issue(
                &self.issuer,
                IssueRequest {
                    owner_id: self.owner.id.clone(),
                    student_name: "Alice Santos".into(),
                    course_name: course.into(),
                    issue_date: Some("2024-06-01".into()),
                    expiration_date: None,
                    metadata: None,
                },
            )
            .await
            .unwrap()
    }

    /// Wait until the worker has settled the record out of `Pending`.
    async fn await_settled(&self, certificate_id: &str) -> certvault_core::Certificate {
        for _ in 0..200 {
            let cert = self.store.get(certificate_id).unwrap();
            if cert.anchor_status != AnchorStatus::Pending {
                return cert;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("anchoring did not settle in time");
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.worker_handle.abort();
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

#[tokio::test]
async fn test_issuance_anchors_in_background() {
    let stack = Stack::new(MockLedger::new());

    let cert = stack.issue("Algorithms").await;
    // Creation never blocks on the ledger: the record starts pending.
    assert_eq!(cert.anchor_status, AnchorStatus::Pending);

    let settled = stack.await_settled(&cert.certificate_id).await;
    assert_eq!(settled.anchor_status, AnchorStatus::Confirmed);
    assert!(settled.anchor_tx_hash.is_some());
    assert!(stack.queue.pending_jobs().unwrap().is_empty());
}

#[tokio::test]
async fn test_verification_reports_ledger_corroboration() {
    let stack = Stack::new(MockLedger::new());

    let cert = stack.issue("Databases").await;
    stack.await_settled(&cert.certificate_id).await;

    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id))
        .unwrap();
    assert!(report.verified);
    assert!(report.blockchain_verified);
}

#[tokio::test]
async fn test_bounded_retries_leave_failed_but_verifiable() {
    // Three failures exhaust the three-attempt policy.
    let stack = Stack::new(MockLedger::failing(3));

    let cert = stack.issue("Compilers").await;
    let settled = stack.await_settled(&cert.certificate_id).await;

    assert_eq!(settled.anchor_status, AnchorStatus::Failed);
    assert!(settled.anchor_tx_hash.is_none());
    assert_eq!(stack.ledger.submission_count(), 3);

    // Content untouched; the certificate still verifies without the
    // ledger's corroboration.
    assert_eq!(settled.certificate_hash, cert.certificate_hash);
    let report = stack
        .engine
        .verify(VerifyRequest::ByHash(cert.certificate_hash.clone()))
        .unwrap();
    assert!(report.verified);
    assert!(!report.blockchain_verified);
}

#[tokio::test]
async fn test_transient_failure_recovers_within_retries() {
    // Two failures, then success: inside the three-attempt policy.
    let stack = Stack::new(MockLedger::failing(2));

    let cert = stack.issue("Networks").await;
    let settled = stack.await_settled(&cert.certificate_id).await;

    assert_eq!(settled.anchor_status, AnchorStatus::Confirmed);
    assert_eq!(stack.ledger.submission_count(), 3);
}

#[tokio::test]
async fn test_failed_record_resubmits_to_confirmation() {
    let stack = Stack::new(MockLedger::failing(3));

    let cert = stack.issue("Statistics").await;
    let settled = stack.await_settled(&cert.certificate_id).await;
    assert_eq!(settled.anchor_status, AnchorStatus::Failed);

    // Manual re-submission: failed is not a terminal state.
    stack.anchor.resubmit(&cert.certificate_id).await.unwrap();
    let settled = stack.await_settled(&cert.certificate_id).await;
    assert_eq!(settled.anchor_status, AnchorStatus::Confirmed);
}

#[tokio::test]
async fn test_revocation_during_pending_anchor() {
    let stack = Stack::new(MockLedger::failing(2));

    let cert = stack.issue("Geometry").await;
    // Revoke while the worker is still retrying.
    stack
        .issuer_svc
        .revoke(&stack.issuer, &cert.certificate_id)
        .await
        .unwrap();

    let settled = stack.await_settled(&cert.certificate_id).await;
    // The anchor completes for the historical record...
    assert_eq!(settled.anchor_status, AnchorStatus::Confirmed);
    // ...but verification reports revoked regardless of anchor status.
    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id))
        .unwrap();
    assert!(!report.verified);
    assert_eq!(report.message, "certificate has been revoked");
}
