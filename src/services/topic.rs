use crate::{
    error::{AppError, AppResult},
    models::{topic, Topic, TopicModel, TopicStatus},
    services::forum::ForumService,
    utils::slug::{is_valid_slug, slugify},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};

pub struct TopicService {
    db: DatabaseConnection,
}

impl TopicService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<TopicModel> {
        Topic::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_in_forum(&self, forum_id: i32, slug: &str) -> AppResult<TopicModel> {
        Topic::find()
            .filter(topic::Column::ForumId.eq(forum_id))
            .filter(topic::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_by_forum(&self, forum_id: i32) -> AppResult<Vec<TopicModel>> {
        let topics = Topic::find()
            .filter(topic::Column::ForumId.eq(forum_id))
            .order_by_desc(topic::Column::LastPostOn)
            .order_by_desc(topic::Column::Id)
            .all(&self.db)
            .await?;
        Ok(topics)
    }

    pub async fn slug_taken<C: ConnectionTrait>(
        conn: &C,
        forum_id: i32,
        slug: &str,
    ) -> AppResult<bool> {
        let count = Topic::find()
            .filter(topic::Column::ForumId.eq(forum_id))
            .filter(topic::Column::Slug.eq(slug))
            .count(conn)
            .await?;
        Ok(count > 0)
    }

    /// Topics are normally created by the forum application; this exists for
    /// imports and fixtures. An empty `slug` is derived from the subject. The
    /// owning forum's trackers are refreshed.
    pub async fn create(
        &self,
        forum_id: i32,
        poster_id: Option<i32>,
        subject: &str,
        slug: &str,
        posts_count: i32,
    ) -> AppResult<TopicModel> {
        let slug = if slug.is_empty() {
            slugify(subject)
        } else {
            slug.to_string()
        };
        if !is_valid_slug(&slug) {
            return Err(AppError::Validation(format!("Invalid topic slug '{}'", slug)));
        }

        let txn = self.db.begin().await?;
        if Self::slug_taken(&txn, forum_id, &slug).await? {
            return Err(AppError::Validation(format!(
                "A topic with slug '{}' already exists in this forum",
                slug
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        let new_topic = topic::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(forum_id),
            poster_id: sea_orm::ActiveValue::Set(poster_id),
            subject: sea_orm::ActiveValue::Set(subject.to_string()),
            slug: sea_orm::ActiveValue::Set(slug),
            status: sea_orm::ActiveValue::Set(TopicStatus::Normal.to_string()),
            posts_count: sea_orm::ActiveValue::Set(posts_count),
            last_post_on: sea_orm::ActiveValue::Set(Some(now)),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let created = new_topic.insert(&txn).await?;
        ForumService::save(&txn, forum_id).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Persists pending changes and refreshes the trackers of the forum the
    /// topic belongs to after the save.
    pub async fn save<C: ConnectionTrait>(
        conn: &C,
        mut active: topic::ActiveModel,
    ) -> AppResult<TopicModel> {
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let saved = active.update(conn).await?;
        ForumService::save(conn, saved.forum_id).await?;
        Ok(saved)
    }
}
