//! User directory
//!
//! Storage is owned by the host application; this crate only needs to find,
//! create and touch accounts. An in-memory backend is provided for tests and
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{AuthError, AuthResult, UserRecord};

/// Trait for user account storage
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    /// Store a new account
    async fn create(&self, user: UserRecord) -> AuthResult<UserRecord>;

    /// Replace the avatar of an existing account
    async fn update_avatar(&self, id: Uuid, avatar: &str) -> AuthResult<UserRecord>;
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the directory is empty
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: UserRecord) -> AuthResult<UserRecord> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AuthError::Directory(format!(
                "email already registered: {}",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> AuthResult<UserRecord> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AuthError::Directory(format!("user not found: {}", id)))?;
        user.avatar = avatar.to_string();
        Ok(user.clone())
    }
}
