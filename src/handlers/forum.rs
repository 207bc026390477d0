use crate::error::{AppError, AppResult};
use crate::handlers::topic::TopicResponse;
use crate::models::ForumModel;
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::forum::ForumService;
use crate::services::topic::TopicService;
use crate::urls::forum_url;
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumResponse {
    /// Forum ID
    pub id: i32,
    /// Forum name
    pub name: String,
    /// Forum description
    pub description: String,
    /// URL slug
    pub slug: String,
    /// forum, category or link
    pub kind: String,
    /// Display sort order
    pub sort_order: i32,
    /// Number of topics in the forum
    pub topics_count: i32,
    /// Number of posts across all topics
    pub posts_count: i32,
    /// Most recent post time
    pub last_post_on: Option<String>,
    /// Forum page URL
    pub url: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl From<ForumModel> for ForumResponse {
    fn from(f: ForumModel) -> Self {
        Self {
            url: forum_url(&f),
            id: f.id,
            name: f.name,
            description: f.description,
            slug: f.slug,
            kind: f.kind,
            sort_order: f.sort_order,
            topics_count: f.topics_count,
            posts_count: f.posts_count,
            last_post_on: f.last_post_on.map(|t| t.to_string()),
            created_at: f.created_at.to_string(),
            updated_at: f.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumPageResponse {
    pub forum: ForumResponse,
    pub topics: Vec<TopicResponse>,
}

pub(crate) fn make_forum_service(
    db: DatabaseConnection,
    cache: Option<CacheService>,
) -> ForumService {
    let service = ForumService::new(db);
    match cache {
        Some(c) => service.with_cache(c),
        None => service,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/forums",
    responses(
        (status = 200, description = "List all forums", body = Vec<ForumResponse>),
    ),
    tag = "forums"
)]
pub async fn list_forums(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
) -> AppResult<impl IntoResponse> {
    let service = make_forum_service(db, cache.map(|c| c.0));
    let forums = service.list().await?;
    let response: Vec<ForumResponse> = forums.into_iter().map(ForumResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{slug}",
    params(("slug" = String, Path, description = "Forum slug")),
    responses(
        (status = 200, description = "Forum page with its topics", body = ForumPageResponse),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn get_forum(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let forum = ForumService::new(db.clone()).get_by_slug(&slug).await?;
    let topics = TopicService::new(db).list_by_forum(forum.id).await?;

    Ok(ApiResponse::ok(ForumPageResponse {
        forum: ForumResponse::from(forum),
        topics: topics.into_iter().map(TopicResponse::from).collect(),
    }))
}
