use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::time::Duration;

/// Connection pool bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub max: u32,
    pub min: u32,
}

impl PoolSize {
    /// A single long-lived connection. In-memory SQLite databases live only as
    /// long as their connection, so they need this.
    pub const SINGLE: PoolSize = PoolSize { max: 1, min: 1 };

    pub fn from_env() -> Self {
        let max = u32_from_env("DB_MAX_CONNECTIONS").unwrap_or(10).max(1);
        let min = u32_from_env("DB_MIN_CONNECTIONS").unwrap_or(2).min(max);
        Self { max, min }
    }
}

fn u32_from_env(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

pub async fn connect(
    database_url: &str,
    pool: PoolSize,
    sql_logging: bool,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool.max)
        .min_connections(pool.min)
        .connect_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(sql_logging);

    Database::connect(opt).await
}

/// Connects to `DATABASE_URL` with the pool configured in the environment.
pub async fn get_database() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;

    connect(&database_url, PoolSize::from_env(), true).await
}
