//! User persistence layer.
//!
//! The authentication component holds no state of its own: it talks to a
//! [`UserStore`] injected at construction, so a database-backed store can be
//! swapped in without touching verification logic. [`mem::MemUserStore`] is
//! the in-process implementation used by the demo deployment and the tests.

pub mod mem;

pub use mem::MemUserStore;

use crate::models::{NewUser, User, UserUpdate};
use async_trait::async_trait;

/// Storage-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Operations the auth component requires from a user store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn get_by_wallet_address(
        &self,
        wallet_address: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Create a user, atomically insert-if-absent per wallet address.
    ///
    /// If the wallet address is already bound, the existing record is
    /// returned unchanged: two concurrent first logins for one wallet must
    /// resolve to a single record, with the loser seeing the winner's row.
    /// A username collision is an error the caller retries with a new name.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn update(&self, id: i64, changes: UserUpdate) -> Result<Option<User>, StoreError>;
}
