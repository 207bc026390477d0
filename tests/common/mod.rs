#![allow(dead_code)]

use forum_moderation::{
    config::database::{self, PoolSize},
    models::{forum::KIND_FORUM, ForumModel, Topic, TopicModel, UserModel},
    services::{forum::ForumService, topic::TopicService, user::UserService},
    DbPermissionHandler, SharedPermissionHandler,
};
use reqwest::{header, Client, Response};
use sea_orm::{DatabaseConnection, EntityTrait};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::Once;

static INIT: Once = Once::new();

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = forum_moderation::config::jwt::JwtConfig::from_env().unwrap();
        let _ = forum_moderation::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    /// Resolves a `Location` header (already prefixed with `/api/v1`).
    pub fn location_url(&self, location: &str) -> String {
        format!("{}{}", self.addr, location)
    }

    pub async fn topic(&self, id: i32) -> Option<TopicModel> {
        Topic::find_by_id(id).one(&self.db).await.unwrap()
    }

    pub async fn forum(&self, id: i32) -> ForumModel {
        ForumService::new(self.db.clone()).get_by_id(id).await.unwrap()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_inner(None).await
}

/// Spawns the app with a custom permission handler instead of the
/// database-backed one.
pub async fn spawn_app_with_permissions(permissions: SharedPermissionHandler) -> TestApp {
    spawn_app_inner(Some(permissions)).await
}

async fn spawn_app_inner(permissions: Option<SharedPermissionHandler>) -> TestApp {
    init_env();

    let db = database::connect("sqlite::memory:", PoolSize::SINGLE, false)
        .await
        .expect("Failed to open in-memory database");

    forum_moderation::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let permissions = permissions.unwrap_or_else(|| DbPermissionHandler::shared(db.clone()));

    let app = axum::Router::new()
        .merge(forum_moderation::routes::create_routes())
        .layer(axum::middleware::from_fn(
            forum_moderation::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(permissions));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    // Redirects are asserted on, never followed.
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client,
    }
}

/// Create a user with `role` and return it with an access token.
pub async fn create_user(app: &TestApp, username: &str, role: &str) -> (UserModel, String) {
    let user = UserService::new(app.db.clone())
        .create(username, role)
        .await
        .expect("Failed to create user");
    let token = forum_moderation::utils::encode_access_token(user.id)
        .expect("Failed to mint access token");
    (user, token)
}

pub async fn create_forum(app: &TestApp, slug: &str) -> ForumModel {
    create_forum_of_kind(app, slug, KIND_FORUM).await
}

pub async fn create_forum_of_kind(app: &TestApp, slug: &str, kind: &str) -> ForumModel {
    ForumService::new(app.db.clone())
        .create(&format!("Forum {}", slug), "A test forum", slug, kind, 0)
        .await
        .expect("Failed to create forum")
}

pub async fn create_topic(
    app: &TestApp,
    forum: &ForumModel,
    slug: &str,
    posts_count: i32,
) -> TopicModel {
    TopicService::new(app.db.clone())
        .create(forum.id, None, &format!("Topic {}", slug), slug, posts_count)
        .await
        .expect("Failed to create topic")
}

pub async fn make_moderator(app: &TestApp, forum: &ForumModel, user: &UserModel) {
    UserService::new(app.db.clone())
        .add_moderator(forum.id, user.id)
        .await
        .expect("Failed to add moderator");
}

pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("Response missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// `name=value` part of the flash cookie set by a response, ready to be sent
/// back in a `Cookie` header.
pub fn flash_cookie(resp: &Response) -> String {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("flash_messages="))
        .and_then(|v| v.split(';').next())
        .expect("Response missing flash cookie")
        .to_string()
}
