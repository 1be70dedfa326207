//! Recipient resolution.

use std::collections::HashSet;

use courier_common::AppResult;
use courier_db::entities::notification;

use crate::services::directory::IdentityStore;

/// Resolves a notification's addressing into a concrete recipient set.
#[derive(Clone)]
pub struct RecipientResolver {
    directory: IdentityStore,
}

impl RecipientResolver {
    /// Create a new recipient resolver.
    #[must_use]
    pub fn new(directory: IdentityStore) -> Self {
        Self { directory }
    }

    /// Resolve the recipient user ids for a notification.
    ///
    /// Global notifications address a point-in-time snapshot of every known
    /// user; users created afterwards are only covered by the new-user
    /// backfill. Targeted notifications use the stored list verbatim,
    /// deduplicated. An empty target list resolves to no recipients.
    pub async fn resolve(&self, n: &notification::Model) -> AppResult<Vec<String>> {
        if n.is_global {
            return self.directory.list_all_user_ids().await;
        }

        let targets: Vec<String> =
            serde_json::from_value(n.target_users.clone()).unwrap_or_default();

        let mut seen = HashSet::new();
        Ok(targets
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }
}
