//! Integration test: share-link lifecycle, from issuance through expiry
//! and revocation, including the end-to-end third-party scenario.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;

use certvault_anchor::{AnchorPolicy, AnchorWorker, MockLedger};
use certvault_core::{Role, User};
use certvault_service::{
    CertificateIssuer, IssueRequest, ServiceError, ShareLinkManager, SharePolicy,
    VerificationEngine, VerifyRequest,
};
use certvault_store::{
    AnchorQueueStore, CertificateStore, Database, ShareLinkStore, UserDirectory,
};

struct Stack {
    dir: PathBuf,
    issuer_svc: CertificateIssuer,
    shares: Arc<ShareLinkManager>,
    links: Arc<ShareLinkStore>,
    engine: VerificationEngine,
    issuer: User,
    owner: User,
}

impl Stack {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "certvault-share-integration-{}",
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
            links.clone(),
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
            issuer_svc: CertificateIssuer::new(store.clone(), directory, anchor),
            shares: shares.clone(),
            links,
            engine: VerificationEngine::new(store, shares),
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

    /// Rewind a stored link's expiry so its age appears to be `days` days.
    fn age_link(&self, token: &str, days: i64) {
        let mut link = self.links.get(token).unwrap();
        link.expires_at -= Duration::days(days);
        self.links.put(&link).unwrap();
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

// =========================================================================
// Expiry window
// =========================================================================

#[tokio::test]
async fn test_seven_day_link_window() {
    let stack = Stack::new();
    let cert = stack.issue("Algorithms").await;

    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 7)
        .unwrap();

    // Day 6: still inside the window.
    stack.age_link(&link.link_token, 6);
    let (_, resolved) = stack
        .shares
        .resolve(&link.link_token)
        .expect("day six should resolve");
    assert_eq!(resolved.certificate_id, cert.certificate_id);

    // Day 8: past the window.
    stack.age_link(&link.link_token, 2);
    assert!(matches!(
        stack.shares.resolve(&link.link_token),
        Err(ServiceError::LinkExpired)
    ));
}

#[tokio::test]
async fn test_requested_lifetime_capped_by_policy() {
    let stack = Stack::new();
    let cert = stack.issue("Databases").await;

    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 3650)
        .unwrap();
    assert!(link.expires_at - link.created_at <= Duration::days(30));
}

// =========================================================================
// Scope and failure reporting
// =========================================================================

#[tokio::test]
async fn test_link_scoped_to_exactly_one_certificate() {
    let stack = Stack::new();
    let target = stack.issue("Algorithms").await;
    let other = stack.issue("Compilers").await;

    let link = stack
        .shares
        .issue(&stack.owner, &target.certificate_id, 7)
        .unwrap();

    let (_, resolved) = stack.shares.resolve(&link.link_token).unwrap();
    assert_eq!(resolved.certificate_id, target.certificate_id);
    assert_ne!(resolved.certificate_id, other.certificate_id);
}

#[tokio::test]
async fn test_distinct_denial_reasons() {
    let stack = Stack::new();
    let cert = stack.issue("Networks").await;

    // Unknown token.
    assert!(matches!(
        stack.shares.resolve("unknown-token"),
        Err(ServiceError::NotFound(_))
    ));

    // Administratively revoked link.
    let revoked_link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 7)
        .unwrap();
    stack
        .shares
        .revoke(&stack.owner, &revoked_link.link_token)
        .unwrap();
    assert!(matches!(
        stack.shares.resolve(&revoked_link.link_token),
        Err(ServiceError::LinkRevoked)
    ));

    // Expired link.
    let expired_link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 1)
        .unwrap();
    stack.age_link(&expired_link.link_token, 2);
    assert!(matches!(
        stack.shares.resolve(&expired_link.link_token),
        Err(ServiceError::LinkExpired)
    ));
}

#[tokio::test]
async fn test_link_revocation_independent_of_certificate() {
    let stack = Stack::new();
    let cert = stack.issue("Statistics").await;

    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 7)
        .unwrap();
    stack.shares.revoke(&stack.owner, &link.link_token).unwrap();

    // The link is dead but the certificate itself still verifies.
    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id))
        .unwrap();
    assert!(report.verified);
}

// =========================================================================
// End-to-end third-party scenario
// =========================================================================

#[tokio::test]
async fn test_share_then_expire_then_revoke_scenario() {
    let stack = Stack::new();

    // Issuer I issues a certificate for owner O.
    let cert = stack.issue("Algorithms").await;

    // O creates a one-day share link.
    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 1)
        .unwrap();

    // A third party resolves the link immediately and receives the
    // certificate.
    let report = stack
        .engine
        .verify(VerifyRequest::ByShareToken(link.link_token.clone()))
        .unwrap();
    assert!(report.verified);
    assert_eq!(
        report.certificate.unwrap().certificate_id,
        cert.certificate_id
    );

    // Two days later the same token is expired.
    stack.age_link(&link.link_token, 2);
    let report = stack
        .engine
        .verify(VerifyRequest::ByShareToken(link.link_token.clone()))
        .unwrap();
    assert!(!report.verified);
    assert_eq!(report.message, "share link has expired");

    // Meanwhile I revokes the certificate; direct verification by anyone
    // now reports revoked.
    stack
        .issuer_svc
        .revoke(&stack.issuer, &cert.certificate_id)
        .await
        .unwrap();
    let report = stack
        .engine
        .verify(VerifyRequest::ById(cert.certificate_id))
        .unwrap();
    assert!(!report.verified);
    assert_eq!(report.message, "certificate has been revoked");
}

#[tokio::test]
async fn test_fresh_link_surfaces_certificate_revocation() {
    let stack = Stack::new();
    let cert = stack.issue("Geometry").await;

    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 7)
        .unwrap();
    stack
        .issuer_svc
        .revoke(&stack.issuer, &cert.certificate_id)
        .await
        .unwrap();

    // The link still resolves, and the verification layer reports the
    // revocation rather than hiding it behind the share.
    let report = stack
        .engine
        .verify(VerifyRequest::ByShareToken(link.link_token.clone()))
        .unwrap();
    assert!(!report.verified);
    assert_eq!(report.message, "certificate has been revoked");
    assert!(report.certificate.is_some());
}

#[tokio::test]
async fn test_access_count_tracks_resolutions() {
    let stack = Stack::new();
    let cert = stack.issue("History").await;

    let link = stack
        .shares
        .issue(&stack.owner, &cert.certificate_id, 7)
        .unwrap();

    for _ in 0..3 {
        stack.shares.resolve(&link.link_token).unwrap();
    }
    let stored = stack.links.get(&link.link_token).unwrap();
    assert_eq!(stored.access_count, 3);

    // Failed resolutions do not count.
    stack.age_link(&link.link_token, 30);
    stack.shares.resolve(&link.link_token).err().unwrap();
    let stored = stack.links.get(&link.link_token).unwrap();
    assert_eq!(stored.access_count, 3);
}
