//! The user directory: account profiles plus their password hashes.

use std::sync::Arc;

use chrono::Utc;
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};

use certvault_core::{new_user_id, Role, User};

use crate::db::{Database, CF_USERNAME_INDEX, CF_USERS};
use crate::error::StoreError;

/// A stored account: the public profile plus the argon2 password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

pub struct UserDirectory {
    db: Arc<Database>,
}

impl UserDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new account. Usernames are unique.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        if self
            .db
            .get(CF_USERNAME_INDEX, username.as_bytes())?
            .is_some()
        {
            return Err(StoreError::Conflict(format!(
                "username '{}' already registered",
                username
            )));
        }

        let user = User {
            id: new_user_id(),
            username: username.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        let stored = StoredUser {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &self.db.cf(CF_USERS)?,
            user.id.as_bytes(),
            &serde_json::to_vec(&stored)?,
        );
        batch.put_cf(
            &self.db.cf(CF_USERNAME_INDEX)?,
            username.as_bytes(),
            user.id.as_bytes(),
        );
        self.db.write(batch)?;

        tracing::info!(user_id = %user.id, username = %username, role = %role, "user registered");
        Ok(user)
    }

    /// Fetch an account by id.
    pub fn get(&self, user_id: &str) -> Result<StoredUser, StoreError> {
        match self.db.get(CF_USERS, user_id.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("user record: {}", e))),
            None => Err(StoreError::NotFound(format!("user {}", user_id))),
        }
    }

    /// Fetch an account by username.
    pub fn get_by_username(&self, username: &str) -> Result<StoredUser, StoreError> {
        match self.db.get(CF_USERNAME_INDEX, username.as_bytes())? {
            Some(id_bytes) => self.get(&String::from_utf8_lossy(&id_bytes)),
            None => Err(StoreError::NotFound(format!("user '{}'", username))),
        }
    }

    /// List every registered account profile.
    pub fn list(&self) -> Result<Vec<User>, StoreError> {
        let pairs = self.db.scan_all(CF_USERS)?;
        pairs
            .iter()
            .map(|(_, bytes)| {
                serde_json::from_slice::<StoredUser>(bytes)
                    .map(|stored| stored.user)
                    .map_err(|e| StoreError::Corrupt(format!("user record: {}", e)))
            })
            .collect()
    }
}
