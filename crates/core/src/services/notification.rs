//! Notification service.
//!
//! Owns the write path (create + fan-out, backfill) and the read path (feed,
//! unread count, read-state transitions). Creation succeeds as soon as the
//! notification row commits; fan-out is best-effort and never unwinds it.

use chrono::Utc;
use courier_common::{AppError, AppResult, IdGenerator};
use courier_db::entities::{
    delivery,
    notification::{self, NotificationKind},
};
use courier_db::repositories::{DeliveryRepository, NotificationRepository};
use sea_orm::Set;
use serde_json::json;
use tracing::warn;

use crate::services::recipient::RecipientResolver;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum body length in characters.
pub const MAX_BODY_LEN: usize = 1000;
/// Maximum feed page size.
pub const MAX_PAGE_SIZE: u64 = 50;

/// Input for creating a notification.
#[derive(Debug, Clone)]
pub struct CreateNotificationInput {
    /// Notification kind.
    pub kind: NotificationKind,
    /// Headline, trimmed, 1..=200 chars.
    pub title: String,
    /// Body, trimmed, 1..=1000 chars.
    pub body: String,
    /// Opaque kind-specific payload, echoed back verbatim.
    pub metadata: serde_json::Value,
    /// Address every current user?
    pub is_global: bool,
    /// Explicit recipients (ignored when global).
    pub target_users: Vec<String>,
}

/// One feed entry: notification content plus the caller's read state.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Notification id.
    pub id: String,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Headline.
    pub title: String,
    /// Body.
    pub body: String,
    /// Opaque payload.
    pub metadata: serde_json::Value,
    /// Notification creation time.
    pub created_at: chrono::DateTime<Utc>,
    /// Has the caller read this notification?
    pub is_read: bool,
    /// When the caller read it, if ever.
    pub read_at: Option<chrono::DateTime<Utc>>,
}

/// A paginated feed page.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    /// Page window, most recent first.
    pub notifications: Vec<FeedItem>,
    /// Count of all of the caller's deliveries, independent of the window.
    pub total: u64,
    /// Does another page exist after this one?
    pub has_more: bool,
    /// Requested page (1-based).
    pub page: u64,
    /// Requested page size.
    pub limit: u64,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    delivery_repo: DeliveryRepository,
    resolver: RecipientResolver,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        delivery_repo: DeliveryRepository,
        resolver: RecipientResolver,
    ) -> Self {
        Self {
            notification_repo,
            delivery_repo,
            resolver,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a notification and fan it out to its recipients.
    ///
    /// The notification insert is the success criterion: once it commits the
    /// caller gets the created model back regardless of fan-out outcome.
    /// Recipient resolution and delivery creation run afterwards and swallow
    /// their own failures (logged, reconciled by re-running backfill).
    pub async fn create(
        &self,
        input: CreateNotificationInput,
    ) -> AppResult<notification::Model> {
        let title = input.title.trim().to_string();
        let body = input.body.trim().to_string();

        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "title must be 1..={MAX_TITLE_LEN} characters"
            )));
        }
        if body.is_empty() || body.chars().count() > MAX_BODY_LEN {
            return Err(AppError::Validation(format!(
                "body must be 1..={MAX_BODY_LEN} characters"
            )));
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            kind: Set(input.kind),
            title: Set(title),
            body: Set(body),
            metadata: Set(input.metadata),
            is_global: Set(input.is_global),
            target_users: Set(json!(input.target_users)),
            created_at: Set(Utc::now()),
        };

        let created = self.notification_repo.create(model).await?;

        self.fan_out(&created).await;

        Ok(created)
    }

    /// Create a global new-video notification with denormalized display
    /// metadata.
    pub async fn create_video_notification(
        &self,
        course_id: &str,
        course_name: &str,
        video_id: &str,
        video_title: &str,
    ) -> AppResult<notification::Model> {
        self.create(CreateNotificationInput {
            kind: NotificationKind::NewVideo,
            title: "New Video Available".to_string(),
            body: format!(
                "A new video \"{video_title}\" has been added to the course \"{course_name}\"."
            ),
            metadata: json!({
                "courseId": course_id,
                "videoId": video_id,
                "courseName": course_name,
                "videoTitle": video_title,
            }),
            is_global: true,
            target_users: Vec::new(),
        })
        .await
    }

    /// Materialize delivery rows for a notification's resolved recipients.
    ///
    /// Never fails the caller: resolution errors and insert errors end here.
    async fn fan_out(&self, n: &notification::Model) {
        let recipients = match self.resolver.resolve(n).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(notification_id = %n.id, error = %e, "recipient resolution failed, skipping fan-out");
                return;
            }
        };

        if recipients.is_empty() {
            return;
        }

        let models = self.delivery_models(&recipients, &n.id);
        if let Err(e) = self.delivery_repo.insert_many_ignore_conflicts(models).await {
            warn!(notification_id = %n.id, error = %e, "delivery fan-out failed");
        }
    }

    /// Get a user's paginated feed, most recent notification first.
    pub async fn get_user_feed(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<NotificationFeed> {
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        if limit < 1 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "limit must be 1..={MAX_PAGE_SIZE}"
            )));
        }

        // Saturating: an absurd page number yields an empty window, not a
        // debug-build overflow panic
        let skip = (page - 1).saturating_mul(limit);
        let feed = self.delivery_repo.feed_page(user_id, skip, limit).await?;

        let has_more = skip.saturating_add(feed.items.len() as u64) < feed.total;
        let notifications = feed
            .items
            .into_iter()
            .map(|(d, n)| FeedItem {
                id: n.id,
                kind: n.kind,
                title: n.title,
                body: n.body,
                metadata: n.metadata,
                created_at: n.created_at,
                is_read: d.is_read,
                read_at: d.read_at,
            })
            .collect();

        Ok(NotificationFeed {
            notifications,
            total: feed.total,
            has_more,
            page,
            limit,
        })
    }

    /// Count unread notifications for a user.
    pub async fn get_unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.delivery_repo.count_unread(user_id).await
    }

    /// Mark one notification as read for a user.
    ///
    /// Returns true iff the delivery transitioned from unread to read; false
    /// when no such delivery exists or it was already read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<bool> {
        self.delivery_repo.mark_read(user_id, notification_id).await
    }

    /// Mark all of a user's unread notifications as read.
    ///
    /// Returns the number of deliveries that transitioned.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.delivery_repo.mark_all_read(user_id).await
    }

    /// Backfill delivery rows for a newly provisioned user against every
    /// existing global notification.
    ///
    /// Best-effort with the same semantics as fan-out: duplicate rows are
    /// dropped by the unique index, failures are logged and swallowed, and
    /// re-invocation is the reconciliation path. No-op when no global
    /// notifications exist.
    pub async fn backfill_for_new_user(&self, user_id: &str) {
        let notification_ids = match self.notification_repo.list_global_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(user_id, error = %e, "global notification enumeration failed, skipping backfill");
                return;
            }
        };

        if notification_ids.is_empty() {
            return;
        }

        let models = notification_ids
            .iter()
            .map(|nid| self.delivery_model(user_id, nid))
            .collect();

        if let Err(e) = self.delivery_repo.insert_many_ignore_conflicts(models).await {
            warn!(user_id, error = %e, "new-user backfill failed");
        }
    }

    fn delivery_models(&self, user_ids: &[String], notification_id: &str) -> Vec<delivery::ActiveModel> {
        user_ids
            .iter()
            .map(|uid| self.delivery_model(uid, notification_id))
            .collect()
    }

    fn delivery_model(&self, user_id: &str, notification_id: &str) -> delivery::ActiveModel {
        delivery::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            notification_id: Set(notification_id.to_string()),
            is_read: Set(false),
            read_at: Set(None),
            created_at: Set(Utc::now()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::directory::UserDirectory;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::sync::Arc;

    struct FakeDirectory {
        ids: Vec<String>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl UserDirectory for FakeDirectory {
        async fn list_all_user_ids(&self) -> AppResult<Vec<String>> {
            if self.fail {
                return Err(AppError::Database("identity store unreachable".into()));
            }
            Ok(self.ids.clone())
        }
    }

    fn service(db: Arc<DatabaseConnection>, ids: Vec<&str>, fail: bool) -> NotificationService {
        let resolver = RecipientResolver::new(Arc::new(FakeDirectory {
            ids: ids.into_iter().map(String::from).collect(),
            fail,
        }));
        NotificationService::new(
            NotificationRepository::new(Arc::clone(&db)),
            DeliveryRepository::new(db),
            resolver,
        )
    }

    fn create_input(is_global: bool, target_users: Vec<&str>) -> CreateNotificationInput {
        CreateNotificationInput {
            kind: NotificationKind::System,
            title: "  Maintenance  ".to_string(),
            body: "Scheduled downtime tonight".to_string(),
            metadata: json!({}),
            is_global,
            target_users: target_users.into_iter().map(String::from).collect(),
        }
    }

    fn created_model(id: &str, is_global: bool) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            kind: NotificationKind::System,
            title: "Maintenance".to_string(),
            body: "Scheduled downtime tonight".to_string(),
            metadata: json!({}),
            is_global,
            target_users: json!([]),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlong_title() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service(db, vec![], false);

        let mut input = create_input(true, vec![]);
        input.title = "x".repeat(MAX_TITLE_LEN + 1);

        let err = service.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_body() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service(db, vec![], false);

        let mut input = create_input(true, vec![]);
        input.body = "   ".to_string();

        let err = service.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_global_fans_out_to_all_users() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // Notification insert (RETURNING)
                .append_query_results([[created_model("n1", true)]])
                // Delivery bulk insert (RETURNING "id")
                .append_query_results([vec![btreemap! {
                    "id" => Into::<Value>::into("d3"),
                }]])
                .into_connection(),
        );
        let service = service(db, vec!["a", "b", "c"], false);

        let created = service.create(create_input(true, vec![])).await.unwrap();

        assert_eq!(created.id, "n1");
        assert_eq!(created.title, "Maintenance");
    }

    #[tokio::test]
    async fn test_create_with_empty_target_list_persists_without_deliveries() {
        // Only the notification insert is registered; a delivery insert
        // would panic the mock
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created_model("n1", false)]])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        let created = service.create(create_input(false, vec![])).await.unwrap();

        assert_eq!(created.id, "n1");
    }

    #[tokio::test]
    async fn test_create_survives_resolver_failure() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created_model("n1", true)]])
                .into_connection(),
        );
        let service = service(db, vec![], true);

        // Identity store down: creation still succeeds, fan-out is skipped
        let created = service.create(create_input(true, vec![])).await.unwrap();

        assert_eq!(created.id, "n1");
    }

    #[tokio::test]
    async fn test_create_video_notification_is_global_with_denormalized_metadata() {
        let model = notification::Model {
            id: "n1".to_string(),
            kind: NotificationKind::NewVideo,
            title: "New Video Available".to_string(),
            body: "A new video \"Intro\" has been added to the course \"Rust 101\".".to_string(),
            metadata: json!({
                "courseId": "c1",
                "videoId": "v1",
                "courseName": "Rust 101",
                "videoTitle": "Intro",
            }),
            is_global: true,
            target_users: json!([]),
            created_at: Utc::now(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[model]])
                .into_connection(),
        );
        // Empty directory: global fan-out resolves to nobody, no insert runs
        let service = service(db, vec![], false);

        let created = service
            .create_video_notification("c1", "Rust 101", "v1", "Intro")
            .await
            .unwrap();

        assert!(created.is_global);
        assert_eq!(created.kind, NotificationKind::NewVideo);
        assert_eq!(created.title, "New Video Available");
        assert_eq!(created.metadata["videoId"], "v1");
        assert_eq!(created.metadata["courseName"], "Rust 101");
    }

    #[tokio::test]
    async fn test_feed_tolerates_extreme_page_numbers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![btreemap! {
                    "num_items" => Into::<Value>::into(0i64),
                }]])
                .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        // Far past the end of any real feed; must page empty, not overflow
        let feed = service.get_user_feed("u1", u64::MAX, 50).await.unwrap();

        assert!(feed.notifications.is_empty());
        assert!(!feed.has_more);
    }

    #[tokio::test]
    async fn test_feed_rejects_out_of_range_paging() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service(db, vec![], false);

        assert!(matches!(
            service.get_user_feed("u1", 0, 10).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            service.get_user_feed("u1", 1, 0).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            service
                .get_user_feed("u1", 1, MAX_PAGE_SIZE + 1)
                .await
                .unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_feed_last_page_has_no_more() {
        let now = Utc::now();
        let rows: Vec<_> = (0..2)
            .map(|i| {
                btreemap! {
                    "A_id" => Into::<Value>::into(format!("d{i}")),
                    "A_user_id" => Into::<Value>::into("u1"),
                    "A_notification_id" => Into::<Value>::into(format!("n{i}")),
                    "A_is_read" => Into::<Value>::into(false),
                    "A_read_at" => Into::<Value>::into(None::<chrono::DateTime<Utc>>),
                    "A_created_at" => Into::<Value>::into(now),
                    "B_id" => Into::<Value>::into(format!("n{i}")),
                    "B_kind" => Into::<Value>::into("system"),
                    "B_title" => Into::<Value>::into("Maintenance"),
                    "B_body" => Into::<Value>::into("Scheduled downtime tonight"),
                    "B_metadata" => Into::<Value>::into(json!({})),
                    "B_is_global" => Into::<Value>::into(true),
                    "B_target_users" => Into::<Value>::into(json!([])),
                    "B_created_at" => Into::<Value>::into(now),
                }
            })
            .collect();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![btreemap! {
                    "num_items" => Into::<Value>::into(12i64),
                }]])
                .append_query_results([rows])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        // 12 deliveries, limit 5: page 3 returns the final 2 items
        let feed = service.get_user_feed("u1", 3, 5).await.unwrap();

        assert_eq!(feed.total, 12);
        assert_eq!(feed.notifications.len(), 2);
        assert!(!feed.has_more);
        assert_eq!(feed.page, 3);
        assert_eq!(feed.limit, 5);
    }

    #[tokio::test]
    async fn test_feed_first_page_has_more() {
        let now = Utc::now();
        let rows: Vec<_> = (0..5)
            .map(|i| {
                btreemap! {
                    "A_id" => Into::<Value>::into(format!("d{i}")),
                    "A_user_id" => Into::<Value>::into("u1"),
                    "A_notification_id" => Into::<Value>::into(format!("n{i}")),
                    "A_is_read" => Into::<Value>::into(i < 2),
                    "A_read_at" => Into::<Value>::into(None::<chrono::DateTime<Utc>>),
                    "A_created_at" => Into::<Value>::into(now),
                    "B_id" => Into::<Value>::into(format!("n{i}")),
                    "B_kind" => Into::<Value>::into("course_update"),
                    "B_title" => Into::<Value>::into("Course updated"),
                    "B_body" => Into::<Value>::into("New material posted"),
                    "B_metadata" => Into::<Value>::into(json!({"courseId": "c1"})),
                    "B_is_global" => Into::<Value>::into(false),
                    "B_target_users" => Into::<Value>::into(json!(["u1"])),
                    "B_created_at" => Into::<Value>::into(now),
                }
            })
            .collect();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![btreemap! {
                    "num_items" => Into::<Value>::into(12i64),
                }]])
                .append_query_results([rows])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        let feed = service.get_user_feed("u1", 1, 5).await.unwrap();

        assert_eq!(feed.total, 12);
        assert_eq!(feed.notifications.len(), 5);
        assert!(feed.has_more);
        // Content and the caller's read state ride on the same item
        assert!(feed.notifications[0].is_read);
        assert_eq!(feed.notifications[0].metadata, json!({"courseId": "c1"}));
    }

    #[tokio::test]
    async fn test_backfill_is_noop_without_global_notifications() {
        // Only the enumeration query is registered; an insert would panic
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        service.backfill_for_new_user("u-new").await;
    }

    #[tokio::test]
    async fn test_backfill_inserts_for_each_global_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    btreemap! { "id" => Into::<Value>::into("n1") },
                    btreemap! { "id" => Into::<Value>::into("n2") },
                ]])
                .append_query_results([vec![btreemap! {
                    "id" => Into::<Value>::into("d2"),
                }]])
                .into_connection(),
        );
        let service = service(db, vec![], false);

        service.backfill_for_new_user("u-new").await;
    }
}
