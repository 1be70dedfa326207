//! Identity store seam.
//!
//! Global fan-out needs to enumerate every currently-known user. That store
//! is an external collaborator, so it sits behind a trait object; the default
//! implementation reads the local user table.

use std::sync::Arc;

use courier_common::AppResult;
use courier_db::repositories::UserRepository;

/// Enumerates the identifiers of all known users.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// List the id of every user currently known to the identity store.
    async fn list_all_user_ids(&self) -> AppResult<Vec<String>>;
}

/// Shared handle to the identity store.
pub type IdentityStore = Arc<dyn UserDirectory>;

/// Identity store backed by the local user table.
#[derive(Clone)]
pub struct DbUserDirectory {
    users: UserRepository,
}

impl DbUserDirectory {
    /// Create a new database-backed user directory.
    #[must_use]
    pub const fn new(users: UserRepository) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl UserDirectory for DbUserDirectory {
    async fn list_all_user_ids(&self) -> AppResult<Vec<String>> {
        self.users.list_all_ids().await
    }
}
