//! In-memory user store.
//!
//! A single `RwLock` guards the user map and its unique secondary indexes
//! (wallet address, username), so the check-then-create sequence in `create`
//! is atomic with respect to concurrent logins.

use crate::models::{NewUser, User, UserUpdate};
use crate::storage::{StoreError, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    wallet_index: HashMap<String, i64>,
    username_index: HashMap<String, i64>,
    next_id: i64,
}

/// Thread-safe in-memory [`UserStore`] implementation.
#[derive(Default)]
pub struct MemUserStore {
    inner: RwLock<Inner>,
}

impl MemUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_by_wallet_address(
        &self,
        wallet_address: &str,
    ) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .wallet_index
            .get(wallet_address)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .username_index
            .get(username)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        // Insert-if-absent: a lost race resolves to the winning record
        if let Some(wallet) = &new_user.wallet_address {
            if let Some(id) = inner.wallet_index.get(wallet).copied() {
                if let Some(existing) = inner.users.get(&id) {
                    return Ok(existing.clone());
                }
            }
        }

        if inner.username_index.contains_key(&new_user.username) {
            return Err(StoreError::UsernameTaken(new_user.username));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let user = User {
            id,
            username: new_user.username,
            wallet_address: new_user.wallet_address,
            wallet_type: new_user.wallet_type,
            avatar_url: new_user.avatar_url,
            created_at: unix_now(),
        };

        if let Some(wallet) = &user.wallet_address {
            inner.wallet_index.insert(wallet.clone(), id);
        }
        inner.username_index.insert(user.username.clone(), id);
        inner.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserUpdate) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;

        let Some(current) = inner.users.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(username) = &changes.username {
            if let Some(&other) = inner.username_index.get(username) {
                if other != id {
                    return Err(StoreError::UsernameTaken(username.clone()));
                }
            }
        }

        let mut updated = current.clone();
        if let Some(username) = changes.username {
            inner.username_index.remove(&current.username);
            inner.username_index.insert(username.clone(), id);
            updated.username = username;
        }
        if let Some(wallet_type) = changes.wallet_type {
            updated.wallet_type = Some(wallet_type);
        }
        if let Some(avatar_url) = changes.avatar_url {
            updated.avatar_url = Some(avatar_url);
        }

        inner.users.insert(id, updated.clone());
        Ok(Some(updated))
    }
}
