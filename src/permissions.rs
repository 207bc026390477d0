//! Moderation capability checks.
//!
//! Handlers never decide on their own who may moderate a forum: they ask the
//! [`ForumPermissionHandler`] installed as a request extension.

use crate::{
    error::{AppError, AppResult},
    models::{forum_moderator, ForumModel, ForumModerator, UserModel},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::{fmt, sync::Arc};

#[async_trait]
pub trait ForumPermissionHandler: Send + Sync {
    /// Lock and unlock topics of `forum`.
    async fn can_close_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool>;

    async fn can_delete_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool>;

    /// Move topics out of `forum`. Also asked about the destination forum.
    async fn can_move_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool>;
}

pub type SharedPermissionHandler = Arc<dyn ForumPermissionHandler>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CloseTopics,
    DeleteTopics,
    MoveTopics,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::CloseTopics => "can_close_topics",
            Capability::DeleteTopics => "can_delete_topics",
            Capability::MoveTopics => "can_move_topics",
        })
    }
}

impl Capability {
    pub async fn check(
        self,
        handler: &dyn ForumPermissionHandler,
        forum: &ForumModel,
        user: &UserModel,
    ) -> AppResult<bool> {
        match self {
            Capability::CloseTopics => handler.can_close_topics(forum, user).await,
            Capability::DeleteTopics => handler.can_delete_topics(forum, user).await,
            Capability::MoveTopics => handler.can_move_topics(forum, user).await,
        }
    }

    /// Fails with [`AppError::Forbidden`] when the handler refuses.
    pub async fn require(
        self,
        handler: &dyn ForumPermissionHandler,
        forum: &ForumModel,
        user: &UserModel,
    ) -> AppResult<()> {
        if self.check(handler, forum, user).await? {
            return Ok(());
        }

        tracing::warn!(
            user_id = user.id,
            forum_id = forum.id,
            capability = %self,
            "Moderation permission denied"
        );
        Err(AppError::Forbidden)
    }
}

/// Admins moderate everywhere; other users moderate the forums they are
/// listed as moderators of. Banned users never moderate.
pub struct DbPermissionHandler {
    db: DatabaseConnection,
}

impl DbPermissionHandler {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn shared(db: DatabaseConnection) -> SharedPermissionHandler {
        Arc::new(Self::new(db))
    }

    async fn is_moderator(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool> {
        if user.is_banned() {
            return Ok(false);
        }
        if user.is_admin() {
            return Ok(true);
        }

        let count = ForumModerator::find()
            .filter(forum_moderator::Column::ForumId.eq(forum.id))
            .filter(forum_moderator::Column::UserId.eq(user.id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ForumPermissionHandler for DbPermissionHandler {
    async fn can_close_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool> {
        self.is_moderator(forum, user).await
    }

    async fn can_delete_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool> {
        self.is_moderator(forum, user).await
    }

    async fn can_move_topics(&self, forum: &ForumModel, user: &UserModel) -> AppResult<bool> {
        self.is_moderator(forum, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{forum::KIND_FORUM, user::ROLE_USER};

    struct OnlyClose;

    #[async_trait]
    impl ForumPermissionHandler for OnlyClose {
        async fn can_close_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
            Ok(true)
        }

        async fn can_delete_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
            Ok(false)
        }

        async fn can_move_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn fixtures() -> (ForumModel, UserModel) {
        let now = chrono::Utc::now().naive_utc();
        let forum = ForumModel {
            id: 1,
            name: "General".to_string(),
            description: String::new(),
            slug: "general".to_string(),
            kind: KIND_FORUM.to_string(),
            sort_order: 0,
            topics_count: 0,
            posts_count: 0,
            last_post_on: None,
            created_at: now,
            updated_at: now,
        };
        let user = UserModel {
            id: 3,
            username: "mod".to_string(),
            role: ROLE_USER.to_string(),
            created_at: now,
            updated_at: now,
        };
        (forum, user)
    }

    #[tokio::test]
    async fn require_passes_when_handler_allows() {
        let (forum, user) = fixtures();
        assert!(Capability::CloseTopics
            .require(&OnlyClose, &forum, &user)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn require_is_forbidden_when_handler_refuses() {
        let (forum, user) = fixtures();
        for capability in [Capability::DeleteTopics, Capability::MoveTopics] {
            let err = capability
                .require(&OnlyClose, &forum, &user)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden));
        }
    }

    #[test]
    fn capability_names_match_handler_methods() {
        assert_eq!(Capability::CloseTopics.to_string(), "can_close_topics");
        assert_eq!(Capability::MoveTopics.to_string(), "can_move_topics");
    }
}
