//! Test utilities for integration testing.

use axum_test::TestServer;
use sqlx::SqlitePool;

use crate::config::{Config, DatabaseConfig, RateLimitConfig};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        rate_limit: RateLimitConfig {
            window_secs: 60,
            // High enough that ordinary tests never trip the gate; the
            // rate-limit tests pass their own config
            max_requests: 10_000,
        },
    }
}

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config) -> TestServer {
    let app = crate::Application::with_pool(config, pool)
        .await
        .expect("Failed to create application");
    app.into_test_server()
}
