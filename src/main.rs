use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use forum_moderation::{
    config, middleware::security::security_headers_middleware, migration, routes,
    services::cache::CacheService, utils, DbPermissionHandler,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Read routes
        forum_moderation::handlers::forum::list_forums,
        forum_moderation::handlers::forum::get_forum,
        forum_moderation::handlers::topic::get_topic,
        forum_moderation::handlers::flash::consume_messages,
        // Moderation routes
        forum_moderation::handlers::moderation::lock_topic_confirm,
        forum_moderation::handlers::moderation::lock_topic,
        forum_moderation::handlers::moderation::unlock_topic_confirm,
        forum_moderation::handlers::moderation::unlock_topic,
        forum_moderation::handlers::moderation::delete_topic_confirm,
        forum_moderation::handlers::moderation::delete_topic,
        forum_moderation::handlers::moderation::move_topic_form,
        forum_moderation::handlers::moderation::move_topic,
    ),
    components(
        schemas(
            forum_moderation::error::AppError,
            forum_moderation::models::TopicStatus,
            forum_moderation::flash::FlashMessage,
            forum_moderation::flash::FlashLevel,
            forum_moderation::handlers::forum::ForumResponse,
            forum_moderation::handlers::forum::ForumPageResponse,
            forum_moderation::handlers::topic::TopicResponse,
            forum_moderation::handlers::topic::TopicPageResponse,
            forum_moderation::handlers::moderation::ModerationContext,
            forum_moderation::handlers::moderation::MoveTopicForm,
            forum_moderation::handlers::moderation::MoveTopicRequest,
        )
    ),
    tags(
        (name = "forums", description = "Forum pages"),
        (name = "topics", description = "Topic pages"),
        (name = "moderation", description = "Topic moderation actions"),
        (name = "messages", description = "Flash messages"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "forum_moderation=debug,tower_http=debug,axum=debug".into()),
    );
    // LOG_FORMAT=json for log shippers
    if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!(
        "Starting moderation service v{}...",
        env!("CARGO_PKG_VERSION")
    );

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    // Redis/Cache is optional - graceful degradation if unavailable
    let cache = match config::redis::get_redis().await {
        Ok(conn) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let permissions = DbPermissionHandler::shared(db.clone());

    let mut app = create_app()
        .layer(Extension(db))
        .layer(Extension(permissions));

    if let Some(cache) = cache {
        app = app.layer(Extension(cache));
    }

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // Connection happens later; fail before touching the network.
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::LOCATION]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::middleware::from_fn(security_headers_middleware)),
        )
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Topic moderation",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
