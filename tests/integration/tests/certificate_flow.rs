//! Integration test: full certificate lifecycle across crates.
//!
//! Exercises the issuer → store → verification flow using
//! certvault-service, certvault-store, and certvault-crypto together.

use std::path::PathBuf;
use std::sync::Arc;

use certvault_anchor::{AnchorPolicy, AnchorWorker, MockLedger};
use certvault_core::{AnchorStatus, Role, User};
use certvault_service::{
    CertificateIssuer, IssueRequest, ServiceError, ShareLinkManager, SharePolicy,
    VerificationEngine, VerifyRequest,
};
use certvault_store::{
    AnchorQueueStore, CertificateStore, Database, ShareLinkStore, UserDirectory,
};

/// Helper: a complete service stack over a scratch database.
struct Stack {
    dir: PathBuf,
    directory: Arc<UserDirectory>,
    issuer_svc: CertificateIssuer,
    engine: VerificationEngine,
    issuer: User,
    owner: User,
}

impl Stack {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "certvault-integration-{}",
            rand::random::<u64>()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let db = Arc::new(Database::open(&dir).unwrap());
        let store = Arc::new(CertificateStore::new(db.clone()));
        let links = Arc::new(ShareLinkStore::new(db.clone()));
        let queue = Arc::new(AnchorQueueStore::new(db.clone()));
        let directory = Arc::new(UserDirectory::new(db));

        let (_worker, anchor) = AnchorWorker::new(
            store.clone(),
            queue,
            Arc::new(MockLedger::new()),
            AnchorPolicy::default(),
        );

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
            directory,
            issuer_svc: CertificateIssuer::new(store.clone(), directory.clone(), anchor),
            engine: VerificationEngine::new(store, shares),
            issuer,
            owner,
        }
    }

    fn request(&self, course: &str) -> IssueRequest {
        IssueRequest {
            owner_id: self.owner.id.clone(),
            student_name: "Alice Santos".into(),
            course_name: course.into(),
            issue_date: Some("2024-06-01".into()),
            expiration_date: None,
            metadata: Some(serde_json::json!({"grade": "A", "credits": 12})),
        }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

// =========================================================================
// Issue → verify
// =========================================================================

#[tokio::test]
async fn test_issue_then_verify_by_id_hash_and_content() {
    let stack = Stack::new();

    let cert = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Algorithms"))
        .await
        .expect("issuance should succeed");

    // The stored digest is exactly the recomputed digest of the content.
    assert_eq!(
        certvault_crypto::compute_hash(&cert.content()).to_hex(),
        cert.certificate_hash
    );

    // By id
    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id.clone()))
        .unwrap();
    assert!(report.verified, "fresh certificate should verify");

    // By stored hash
    let report = stack
        .engine
        .verify(VerifyRequest::ByHash(cert.certificate_hash.clone()))
        .unwrap();
    assert!(report.verified);

    // By recomputed content: equivalent up to the one-way hash
    let report = stack
        .engine
        .verify(VerifyRequest::ByContent(cert.content()))
        .unwrap();
    assert!(report.verified);
    assert_eq!(
        report.certificate.unwrap().certificate_id,
        cert.certificate_id
    );
}

#[tokio::test]
async fn test_verification_is_pending_tolerant() {
    let stack = Stack::new();

    // The worker never ran, so the record is still pending; verification
    // must succeed on local hash equality alone.
    let cert = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Databases"))
        .await
        .unwrap();
    assert_eq!(cert.anchor_status, AnchorStatus::Pending);

    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id))
        .unwrap();
    assert!(report.verified);
    assert!(!report.blockchain_verified);
}

// =========================================================================
// Duplicate issuance
// =========================================================================

#[tokio::test]
async fn test_duplicate_issuance_independent_lifecycles() {
    let stack = Stack::new();

    let first = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Algorithms"))
        .await
        .unwrap();
    let second = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Algorithms"))
        .await
        .unwrap();

    assert_ne!(first.certificate_id, second.certificate_id);
    assert_eq!(first.certificate_hash, second.certificate_hash);

    // Revoking one leaves the twin verifiable.
    stack
        .issuer_svc
        .revoke(&stack.issuer, &first.certificate_id)
        .await
        .unwrap();

    let report = stack
        .engine
        .verify(VerifyRequest::ById(first.certificate_id))
        .unwrap();
    assert!(!report.verified);

    let report = stack
        .engine
        .verify(VerifyRequest::ById(second.certificate_id))
        .unwrap();
    assert!(report.verified);
}

// =========================================================================
// Revocation
// =========================================================================

#[tokio::test]
async fn test_revoked_certificate_reports_revoked_not_missing() {
    let stack = Stack::new();

    let cert = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Compilers"))
        .await
        .unwrap();
    stack
        .issuer_svc
        .revoke(&stack.issuer, &cert.certificate_id)
        .await
        .unwrap();

    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id.clone()))
        .unwrap();
    assert!(!report.verified);
    assert_eq!(report.message, "certificate has been revoked");
    assert!(
        report.certificate.is_some(),
        "revoked is found, distinct from not-found"
    );

    let report = stack
        .engine
        .verify(VerifyRequest::ById("missing-id".into()))
        .unwrap();
    assert_eq!(report.message, "certificate not found");
    assert!(report.certificate.is_none());
}

#[tokio::test]
async fn test_revocation_capability_is_issuer_of_record_only() {
    let stack = Stack::new();

    let cert = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Networks"))
        .await
        .unwrap();

    let rival = stack
        .directory
        .create_user("rival", "rival@uni.edu", Role::Issuer, "hash")
        .unwrap();
    let result = stack.issuer_svc.revoke(&rival, &cert.certificate_id).await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));

    let result = stack
        .issuer_svc
        .revoke(&stack.owner, &cert.certificate_id)
        .await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));
}

// =========================================================================
// Listings and views
// =========================================================================

#[tokio::test]
async fn test_owner_and_issuer_listings_scoped() {
    let stack = Stack::new();

    stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("A"))
        .await
        .unwrap();
    stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("B"))
        .await
        .unwrap();

    let owned = stack.issuer_svc.list_owned(&stack.owner).unwrap();
    assert_eq!(owned.len(), 2);

    let issued = stack.issuer_svc.list_issued(&stack.issuer).unwrap();
    assert_eq!(issued.len(), 2);

    // A user with no certificates gets an empty list, not an error.
    let bystander = stack
        .directory
        .create_user("bob", "bob@example.com", Role::User, "hash")
        .unwrap();
    assert!(stack.issuer_svc.list_owned(&bystander).unwrap().is_empty());
}

#[tokio::test]
async fn test_public_view_hides_metadata() {
    let stack = Stack::new();

    let cert = stack
        .issuer_svc
        .issue(&stack.issuer, stack.request("Crypto"))
        .await
        .unwrap();

    let anon = stack.issuer_svc.view(None, &cert.certificate_id).unwrap();
    let json = serde_json::to_value(&anon).unwrap();
    assert!(json.get("metadata").is_none());

    let full = stack
        .issuer_svc
        .view(Some(&stack.owner), &cert.certificate_id)
        .unwrap();
    let json = serde_json::to_value(&full).unwrap();
    assert!(json.get("metadata").is_some());
}
