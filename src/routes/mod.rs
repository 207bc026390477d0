use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use crate::urls::API_PREFIX;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest(API_PREFIX, api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let public_read = public_read_routes(&rate_limit_config);
    let moderation =
        moderation_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    public_read.merge(moderation)
}

/// Pages moderation actions redirect to, plus the flash message inbox.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/forums", routing::get(handlers::forum::list_forums))
        .route("/forums/{slug}", routing::get(handlers::forum::get_forum))
        .route(
            "/forums/{slug}/topics/{topic_slug}",
            routing::get(handlers::topic::get_topic),
        )
        .route("/messages", routing::get(handlers::flash::consume_messages));

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

/// Authenticated moderation actions. Permissions are checked per forum in
/// the handlers.
fn moderation_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/moderation/topics/{id}",
            routing::delete(handlers::moderation::delete_topic),
        )
        .route(
            "/moderation/topics/{id}/lock",
            routing::get(handlers::moderation::lock_topic_confirm)
                .post(handlers::moderation::lock_topic),
        )
        .route(
            "/moderation/topics/{id}/unlock",
            routing::get(handlers::moderation::unlock_topic_confirm)
                .post(handlers::moderation::unlock_topic),
        )
        .route(
            "/moderation/topics/{id}/delete",
            routing::get(handlers::moderation::delete_topic_confirm)
                .post(handlers::moderation::delete_topic),
        )
        .route(
            "/moderation/topics/{id}/move",
            routing::get(handlers::moderation::move_topic_form)
                .post(handlers::moderation::move_topic),
        );

    with_optional_rate_limit(router, config.enabled, config.moderation)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(governor_conf)),
        None => {
            tracing::warn!("Invalid rate limit rule {:?}, rate limiting disabled", rule);
            router
        }
    }
}
