use crate::error::{AppError, AppResult};
use crate::handlers::forum::ForumResponse;
use crate::models::{TopicModel, TopicStatus};
use crate::response::ApiResponse;
use crate::services::forum::ForumService;
use crate::services::topic::TopicService;
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicResponse {
    /// Topic ID
    pub id: i32,
    /// Forum currently holding the topic
    pub forum_id: i32,
    /// Author, if still registered
    pub poster_id: Option<i32>,
    pub subject: String,
    /// URL slug, unique within the forum
    pub slug: String,
    pub status: TopicStatus,
    pub posts_count: i32,
    pub last_post_on: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TopicModel> for TopicResponse {
    fn from(t: TopicModel) -> Self {
        Self {
            status: t.status(),
            id: t.id,
            forum_id: t.forum_id,
            poster_id: t.poster_id,
            subject: t.subject,
            slug: t.slug,
            posts_count: t.posts_count,
            last_post_on: t.last_post_on.map(|d| d.to_string()),
            created_at: t.created_at.to_string(),
            updated_at: t.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicPageResponse {
    pub forum: ForumResponse,
    pub topic: TopicResponse,
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{slug}/topics/{topic_slug}",
    params(
        ("slug" = String, Path, description = "Forum slug"),
        ("topic_slug" = String, Path, description = "Topic slug"),
    ),
    responses(
        (status = 200, description = "Topic page", body = TopicPageResponse),
        (status = 404, description = "Forum or topic not found", body = AppError),
    ),
    tag = "topics"
)]
pub async fn get_topic(
    Extension(db): Extension<DatabaseConnection>,
    Path((forum_slug, topic_slug)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let forum = ForumService::new(db.clone()).get_by_slug(&forum_slug).await?;
    let topic = TopicService::new(db).get_in_forum(forum.id, &topic_slug).await?;

    Ok(ApiResponse::ok(TopicPageResponse {
        forum: ForumResponse::from(forum),
        topic: TopicResponse::from(topic),
    }))
}
