pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod permissions;
pub mod response;
pub mod routes;
pub mod services;
pub mod urls;
pub mod utils;

pub use error::{AppError, AppResult};
pub use middleware::auth::AuthUser;
pub use permissions::{DbPermissionHandler, ForumPermissionHandler, SharedPermissionHandler};
pub use response::ApiResponse;
