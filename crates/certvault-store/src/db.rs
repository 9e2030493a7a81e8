//! RocksDB database handle and column-family helpers.

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

use crate::error::StoreError;

/// Column family names for the different record kinds.
pub const CF_CERTIFICATES: &str = "certificates";
pub const CF_HASH_INDEX: &str = "hash_index";
pub const CF_OWNER_INDEX: &str = "owner_index";
pub const CF_ISSUER_INDEX: &str = "issuer_index";
pub const CF_SHARE_LINKS: &str = "share_links";
pub const CF_USERS: &str = "users";
pub const CF_USERNAME_INDEX: &str = "username_index";
pub const CF_ANCHOR_QUEUE: &str = "anchor_queue";

const ALL_CFS: [&str; 8] = [
    CF_CERTIFICATES,
    CF_HASH_INDEX,
    CF_OWNER_INDEX,
    CF_ISSUER_INDEX,
    CF_SHARE_LINKS,
    CF_USERS,
    CF_USERNAME_INDEX,
    CF_ANCHOR_QUEUE,
];

/// RocksDB-backed database shared by the record stores.
pub struct Database {
    db: DB,
}

impl Database {
    /// Open or create the database at the given path with all column
    /// families.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    pub(crate) fn cf(&self, cf_name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::Corrupt(format!("column family '{}' not found", cf_name)))
    }

    /// Put a value into a column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let cf = self.cf(cf_name)?;
        let value = self.db.get_cf(&cf, key)?;
        Ok(value)
    }

    /// Delete a key from a column family.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), StoreError> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }

    /// Commit a write batch atomically.
    pub fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.db.write(batch)?;
        Ok(())
    }

    /// Collect all values whose key starts with `prefix` in a column family.
    pub fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let cf = self.cf(cf_name)?;
        let mode = IteratorMode::From(prefix, Direction::Forward);
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(value.to_vec());
        }
        Ok(out)
    }

    /// Collect every (key, value) pair in a column family.
    pub fn scan_all(&self, cf_name: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item?;
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}
