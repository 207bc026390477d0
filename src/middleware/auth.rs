use crate::{
    error::AppError,
    models::UserModel,
    services::user::UserService,
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        jwt::{decode_jwt, is_access_token},
    },
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::DatabaseConnection;

/// The authenticated user acting on the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserModel,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// JWT authentication middleware
///
/// Verifies the access token from the Authorization header (or the access
/// token cookie), loads the user, rejects banned users and stores the user in
/// the request extensions.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers)
        .or_else(|| extract_cookie(&headers, ACCESS_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let claims = decode_jwt(&token).map_err(|_| AppError::Unauthorized)?;

    if !is_access_token(&claims) {
        return Err(AppError::Unauthorized);
    }

    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

    // A token for a deleted account is as good as no token.
    let user = match UserService::new(db).get_by_id(user_id).await {
        Ok(user) => user,
        Err(AppError::NotFound) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e),
    };

    if user.is_banned() {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
