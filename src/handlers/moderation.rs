//! Topic moderation: lock, unlock, delete and move.
//!
//! Each action has a confirmation `GET` returning the topic and its forum, and
//! a mutating request that answers with a `303 See Other` to the page the
//! moderator lands on next, carrying a flash message. The permission handler
//! is always asked about the forum the topic is in before the action.

use crate::error::{AppError, AppResult};
use crate::flash::FlashMessages;
use crate::handlers::forum::ForumResponse;
use crate::handlers::topic::TopicResponse;
use crate::middleware::auth::AuthUser;
use crate::models::{ForumModel, TopicModel, UserModel};
use crate::permissions::{Capability, ForumPermissionHandler, SharedPermissionHandler};
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::forum::ForumService;
use crate::services::moderation::{
    ModerationService, DELETE_SUCCESS_MESSAGE, LOCK_SUCCESS_MESSAGE, MOVE_SUCCESS_MESSAGE,
    UNLOCK_SUCCESS_MESSAGE,
};
use crate::services::topic::TopicService;
use crate::urls::{forum_url, topic_url};
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationContext {
    pub topic: TopicResponse,
    /// Forum the topic is in before the action
    pub forum: ForumResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MoveTopicForm {
    pub topic: TopicResponse,
    pub forum: ForumResponse,
    /// Forums the topic may be moved to
    pub forum_choices: Vec<ForumResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MoveTopicRequest {
    /// Destination forum ID
    #[validate(range(min = 1))]
    pub forum_id: i32,
    /// Lock the topic once moved
    #[serde(default)]
    pub lock_topic: bool,
}

/// A topic together with the forum controlling permissions on it.
struct Moderated {
    topic: TopicModel,
    forum: ForumModel,
}

impl Moderated {
    fn into_context(self) -> ModerationContext {
        ModerationContext {
            topic: TopicResponse::from(self.topic),
            forum: ForumResponse::from(self.forum),
        }
    }
}

async fn load_authorized(
    db: &DatabaseConnection,
    permissions: &dyn ForumPermissionHandler,
    user: &UserModel,
    topic_id: i32,
    capability: Capability,
) -> AppResult<Moderated> {
    let topic = TopicService::new(db.clone()).get_by_id(topic_id).await?;
    let forum = ForumService::new(db.clone()).get_by_id(topic.forum_id).await?;
    capability.require(permissions, &forum, user).await?;
    Ok(Moderated { topic, forum })
}

fn make_moderation_service(
    db: DatabaseConnection,
    cache: Option<CacheService>,
) -> ModerationService {
    let service = ModerationService::new(db);
    match cache {
        Some(c) => service.with_cache(c),
        None => service,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/topics/{id}/lock",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Lock confirmation", body = ModerationContext),
        (status = 403, description = "Not allowed to close topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn lock_topic_confirm(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let target = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::CloseTopics,
    )
    .await?;
    Ok(ApiResponse::ok(target.into_context()))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/topics/{id}/lock",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 303, description = "Topic locked, redirect to the topic page"),
        (status = 403, description = "Not allowed to close topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn lock_topic(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let Moderated { topic, forum } = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::CloseTopics,
    )
    .await?;

    let service = make_moderation_service(db, cache.map(|c| c.0));
    let locked = service.lock(topic).await?;
    tracing::info!(
        moderator_id = auth_user.id(),
        topic_id = locked.id,
        forum_id = forum.id,
        "Topic locked"
    );

    Ok(FlashMessages::from_headers(&headers)
        .success(LOCK_SUCCESS_MESSAGE)
        .redirect(&topic_url(&forum, &locked)))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/topics/{id}/unlock",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Unlock confirmation", body = ModerationContext),
        (status = 403, description = "Not allowed to close topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn unlock_topic_confirm(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let target = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::CloseTopics,
    )
    .await?;
    Ok(ApiResponse::ok(target.into_context()))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/topics/{id}/unlock",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 303, description = "Topic unlocked, redirect to the topic page"),
        (status = 403, description = "Not allowed to close topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn unlock_topic(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let Moderated { topic, forum } = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::CloseTopics,
    )
    .await?;

    let service = make_moderation_service(db, cache.map(|c| c.0));
    let unlocked = service.unlock(topic).await?;
    tracing::info!(
        moderator_id = auth_user.id(),
        topic_id = unlocked.id,
        forum_id = forum.id,
        "Topic unlocked"
    );

    Ok(FlashMessages::from_headers(&headers)
        .success(UNLOCK_SUCCESS_MESSAGE)
        .redirect(&topic_url(&forum, &unlocked)))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/topics/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Delete confirmation", body = ModerationContext),
        (status = 403, description = "Not allowed to delete topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn delete_topic_confirm(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let target = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::DeleteTopics,
    )
    .await?;
    Ok(ApiResponse::ok(target.into_context()))
}

/// Served for both `POST .../delete` and `DELETE .../{id}`.
#[utoipa::path(
    post,
    path = "/api/v1/moderation/topics/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 303, description = "Topic deleted, redirect to the forum page"),
        (status = 403, description = "Not allowed to delete topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn delete_topic(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let Moderated { topic, forum } = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::DeleteTopics,
    )
    .await?;

    // The forum page is the only place left to land on.
    let success_url = forum_url(&forum);

    let service = make_moderation_service(db, cache.map(|c| c.0));
    service.delete(&topic).await?;
    tracing::info!(
        moderator_id = auth_user.id(),
        topic_id = topic.id,
        forum_id = forum.id,
        "Topic deleted"
    );

    Ok(FlashMessages::from_headers(&headers)
        .success(DELETE_SUCCESS_MESSAGE)
        .redirect(&success_url))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/topics/{id}/move",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Move form", body = MoveTopicForm),
        (status = 403, description = "Not allowed to move topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn move_topic_form(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let Moderated { topic, forum } = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::MoveTopics,
    )
    .await?;

    let candidates = ForumService::new(db).list_topic_holders(forum.id).await?;
    let mut forum_choices = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if Capability::MoveTopics
            .check(permissions.as_ref(), &candidate, &auth_user.user)
            .await?
        {
            forum_choices.push(ForumResponse::from(candidate));
        }
    }

    Ok(ApiResponse::ok(MoveTopicForm {
        topic: TopicResponse::from(topic),
        forum: ForumResponse::from(forum),
        forum_choices,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/topics/{id}/move",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Topic ID")),
    request_body = MoveTopicRequest,
    responses(
        (status = 303, description = "Topic moved, redirect to its new location"),
        (status = 400, description = "Invalid destination forum", body = AppError),
        (status = 403, description = "Not allowed to move topics in this forum", body = AppError),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn move_topic(
    Extension(db): Extension<DatabaseConnection>,
    Extension(permissions): Extension<SharedPermissionHandler>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    payload: Result<Json<MoveTopicRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Moderated { topic, forum } = load_authorized(
        &db,
        permissions.as_ref(),
        &auth_user.user,
        id,
        Capability::MoveTopics,
    )
    .await?;

    // Malformed bodies are reported only to users allowed to submit the form.
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let target = match ForumService::new(db.clone()).get_by_id(payload.forum_id).await {
        Ok(target) => target,
        Err(AppError::NotFound) => {
            return Err(AppError::Validation(
                "Select a valid destination forum".to_string(),
            ))
        }
        Err(e) => return Err(e),
    };

    if !Capability::MoveTopics
        .check(permissions.as_ref(), &target, &auth_user.user)
        .await?
    {
        return Err(AppError::Validation(format!(
            "You cannot move topics to '{}'",
            target.name
        )));
    }

    let service = make_moderation_service(db, cache.map(|c| c.0));
    let moved = service
        .move_topic(topic, &target, payload.lock_topic)
        .await?;
    tracing::info!(
        moderator_id = auth_user.id(),
        topic_id = moved.id,
        from_forum_id = forum.id,
        to_forum_id = target.id,
        locked = payload.lock_topic,
        "Topic moved"
    );

    Ok(FlashMessages::from_headers(&headers)
        .success(MOVE_SUCCESS_MESSAGE)
        .redirect(&topic_url(&target, &moved)))
}
