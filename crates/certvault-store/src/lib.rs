//! CertVault persistence layer.
//!
//! RocksDB with one column family per record kind plus secondary indexes
//! for hash, owner, and issuer lookups. Certificate mutation is serialized
//! per record; unrelated records never contend.

pub mod anchor_queue;
pub mod certificates;
pub mod db;
pub mod error;
pub mod share_links;
pub mod users;

pub use anchor_queue::{AnchorJob, AnchorQueueStore};
pub use certificates::CertificateStore;
pub use db::Database;
pub use error::StoreError;
pub use share_links::ShareLinkStore;
pub use users::{StoredUser, UserDirectory};
