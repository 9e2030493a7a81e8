//! CertVault anchoring — submits certificate hashes to an external ledger
//! and reconciles confirmation status back onto certificate records.
//!
//! Anchoring is best-effort and asynchronous: certificate creation and
//! verification never wait on the ledger.

pub mod error;
pub mod oracle;
pub mod worker;

pub use error::AnchorError;
pub use oracle::{HttpLedgerOracle, LedgerOracle, MockLedger};
pub use worker::{AnchorPolicy, AnchorService, AnchorWorker};
