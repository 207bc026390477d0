use crate::{
    error::{AppError, AppResult},
    models::{
        forum::{self, KIND_CATEGORY, KIND_FORUM, KIND_LINK},
        topic, Forum, ForumModel, Topic,
    },
    services::cache::CacheService,
    utils::slug::is_valid_slug,
};
use sea_orm::{
    prelude::DateTime, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
};

const CACHE_KEY_FORUMS_LIST: &str = "forums:list";
const CACHE_TTL_FORUMS: u64 = 300; // 5 minutes

/// Derived counters of a forum, recomputed from its topics.
#[derive(Debug, Default, FromQueryResult)]
struct Trackers {
    topics_count: i64,
    posts_count: Option<i64>,
    last_post_on: Option<DateTime>,
}

pub struct ForumService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl ForumService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn list(&self) -> AppResult<Vec<ForumModel>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get::<Vec<ForumModel>>(CACHE_KEY_FORUMS_LIST).await {
                return Ok(cached);
            }
        }

        let forums = Forum::find()
            .order_by_asc(forum::Column::SortOrder)
            .order_by_asc(forum::Column::Id)
            .all(&self.db)
            .await?;

        if let Some(cache) = &self.cache {
            cache
                .set(CACHE_KEY_FORUMS_LIST, &forums, CACHE_TTL_FORUMS)
                .await;
        }

        Ok(forums)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<ForumModel> {
        Forum::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<ForumModel> {
        Forum::find()
            .filter(forum::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Forums able to receive topics, excluding `except_id`.
    pub async fn list_topic_holders(&self, except_id: i32) -> AppResult<Vec<ForumModel>> {
        let forums = Forum::find()
            .filter(forum::Column::Kind.eq(KIND_FORUM))
            .filter(forum::Column::Id.ne(except_id))
            .order_by_asc(forum::Column::SortOrder)
            .order_by_asc(forum::Column::Id)
            .all(&self.db)
            .await?;
        Ok(forums)
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        slug: &str,
        kind: &str,
        sort_order: i32,
    ) -> AppResult<ForumModel> {
        if !is_valid_slug(slug) {
            return Err(AppError::Validation(format!("Invalid forum slug '{}'", slug)));
        }
        if ![KIND_FORUM, KIND_CATEGORY, KIND_LINK].contains(&kind) {
            return Err(AppError::Validation(format!("Invalid forum kind '{}'", kind)));
        }

        let now = chrono::Utc::now().naive_utc();

        let new_forum = forum::ActiveModel {
            name: sea_orm::ActiveValue::Set(name.to_string()),
            description: sea_orm::ActiveValue::Set(description.to_string()),
            slug: sea_orm::ActiveValue::Set(slug.to_string()),
            kind: sea_orm::ActiveValue::Set(kind.to_string()),
            sort_order: sea_orm::ActiveValue::Set(sort_order),
            topics_count: sea_orm::ActiveValue::Set(0),
            posts_count: sea_orm::ActiveValue::Set(0),
            last_post_on: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let forum = new_forum.insert(&self.db).await?;
        self.invalidate_cache().await;
        Ok(forum)
    }

    /// Saves the forum: its trackers are recomputed from the topics it holds
    /// right now. Call inside the transaction that changed those topics.
    pub async fn save<C: ConnectionTrait>(conn: &C, forum_id: i32) -> AppResult<ForumModel> {
        let existing = Forum::find_by_id(forum_id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound)?;

        let trackers = Topic::find()
            .select_only()
            .column_as(topic::Column::Id.count(), "topics_count")
            .column_as(topic::Column::PostsCount.sum(), "posts_count")
            .column_as(topic::Column::LastPostOn.max(), "last_post_on")
            .filter(topic::Column::ForumId.eq(forum_id))
            .into_model::<Trackers>()
            .one(conn)
            .await?
            .unwrap_or_default();

        let mut active: forum::ActiveModel = existing.into();
        active.topics_count = sea_orm::ActiveValue::Set(clamp_count(trackers.topics_count));
        active.posts_count =
            sea_orm::ActiveValue::Set(clamp_count(trackers.posts_count.unwrap_or(0)));
        active.last_post_on = sea_orm::ActiveValue::Set(trackers.last_post_on);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());

        let updated = active.update(conn).await?;
        tracing::debug!(
            forum_id,
            topics_count = updated.topics_count,
            posts_count = updated.posts_count,
            "Forum trackers refreshed"
        );
        Ok(updated)
    }

    pub async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&[CACHE_KEY_FORUMS_LIST]).await;
        }
    }
}

fn clamp_count(value: i64) -> i32 {
    i32::try_from(value.max(0)).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_constant() {
        assert_eq!(CACHE_KEY_FORUMS_LIST, "forums:list");
    }

    #[test]
    fn clamp_count_saturates() {
        assert_eq!(clamp_count(-4), 0);
        assert_eq!(clamp_count(12), 12);
        assert_eq!(clamp_count(i64::MAX), i32::MAX);
    }

    #[test]
    fn missing_trackers_default_to_zero() {
        let trackers = Trackers::default();
        assert_eq!(trackers.topics_count, 0);
        assert_eq!(trackers.posts_count, None);
    }
}
