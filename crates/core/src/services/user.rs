//! User service.

use chrono::Utc;
use courier_common::{AppError, AppResult, IdGenerator};
use courier_db::entities::user;
use courier_db::repositories::UserRepository;
use sea_orm::Set;

/// User service for authentication and provisioning.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Authenticate a user by bearer token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Register a new user and issue an API token.
    pub async fn register(&self, username: &str) -> AppResult<user::Model> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username must not be empty".to_string()));
        }

        if self.user_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "username already taken: {username}"
            )));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(false),
            created_at: Set(Utc::now()),
        };

        self.user_repo.create(model).await
    }
}
