use crate::{
    error::{AppError, AppResult},
    models::{topic, ForumModel, Topic, TopicModel, TopicStatus},
    services::{cache::CacheService, forum::ForumService, topic::TopicService},
};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};

pub const LOCK_SUCCESS_MESSAGE: &str = "This topic has been locked successfully.";
pub const UNLOCK_SUCCESS_MESSAGE: &str = "This topic has been unlocked successfully.";
pub const DELETE_SUCCESS_MESSAGE: &str = "This topic has been deleted successfully.";
pub const MOVE_SUCCESS_MESSAGE: &str = "This topic has been moved successfully.";

/// Applies moderation actions. Permission checks happen before any call
/// into this service.
pub struct ModerationService {
    db: DatabaseConnection,
    forums: ForumService,
}

impl ModerationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            forums: ForumService::new(db.clone()),
            db,
        }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.forums = self.forums.with_cache(cache);
        self
    }

    pub async fn lock(&self, topic: TopicModel) -> AppResult<TopicModel> {
        self.set_status(topic, TopicStatus::Locked).await
    }

    pub async fn unlock(&self, topic: TopicModel) -> AppResult<TopicModel> {
        self.set_status(topic, TopicStatus::Normal).await
    }

    async fn set_status(&self, topic: TopicModel, status: TopicStatus) -> AppResult<TopicModel> {
        let mut active: topic::ActiveModel = topic.into();
        active.status = sea_orm::ActiveValue::Set(status.to_string());

        let txn = self.db.begin().await?;
        let saved = TopicService::save(&txn, active).await?;
        txn.commit().await?;

        self.forums.invalidate_cache().await;
        Ok(saved)
    }

    pub async fn delete(&self, topic: &TopicModel) -> AppResult<()> {
        let txn = self.db.begin().await?;
        let result = Topic::delete_by_id(topic.id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        ForumService::save(&txn, topic.forum_id).await?;
        txn.commit().await?;

        self.forums.invalidate_cache().await;
        Ok(())
    }

    /// Moves `topic` into `target`. Both the topic (and with it the target
    /// forum) and the forum it came from are saved, so the trackers of both
    /// forums reflect the move.
    pub async fn move_topic(
        &self,
        topic: TopicModel,
        target: &ForumModel,
        lock_topic: bool,
    ) -> AppResult<TopicModel> {
        validate_move_target(&topic, target)?;

        let txn = self.db.begin().await?;
        if TopicService::slug_taken(&txn, target.id, &topic.slug).await? {
            return Err(AppError::Validation(format!(
                "A topic with the same slug already exists in '{}'",
                target.name
            )));
        }

        let old_forum_id = topic.forum_id;
        let mut active: topic::ActiveModel = topic.into();
        active.forum_id = sea_orm::ActiveValue::Set(target.id);
        active.status = sea_orm::ActiveValue::Set(status_after_move(lock_topic).to_string());

        let moved = TopicService::save(&txn, active).await?;
        ForumService::save(&txn, old_forum_id).await?;
        txn.commit().await?;

        self.forums.invalidate_cache().await;
        Ok(moved)
    }
}

pub fn status_after_move(lock_topic: bool) -> TopicStatus {
    if lock_topic {
        TopicStatus::Locked
    } else {
        TopicStatus::Moved
    }
}

/// A topic can only go to a different forum that is able to hold topics.
pub fn validate_move_target(topic: &TopicModel, target: &ForumModel) -> AppResult<()> {
    if target.id == topic.forum_id {
        return Err(AppError::Validation(
            "The topic is already in this forum".to_string(),
        ));
    }
    if !target.accepts_topics() {
        return Err(AppError::Validation(format!(
            "Topics cannot be moved to '{}'",
            target.name
        )));
    }
    Ok(())
}
