//! # nidctl: Service-Client Registry and National-ID Validation API
//!
//! `nidctl` exposes a small set of HTTP resources — registered service
//! clients and an Egyptian national-ID validation endpoint — backed by a
//! relational store, behind API-key authentication, per-identity rate
//! limiting, and automatic request-usage logging.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); persistence is
//! SQLite through SQLx. The interesting part is the generic
//! resource-operation stack in the middle:
//!
//! - The **database layer** ([`db`]) follows the repository pattern. A single
//!   generic repository, [`db::handlers::Table`], serves every record type:
//!   each type declares a static field registry
//!   ([`db::record::Record`]) and gets dynamic equality filtering, ordered
//!   pagination, and relation/uniqueness validation from the shared
//!   implementation.
//! - The **operation layer** ([`lifecycle`]) turns a record type and an
//!   output projection into the six resource verbs, each a fixed
//!   validate → pre-hook → action → post-hook → project pipeline with
//!   optional callbacks configured per resource in [`services`].
//! - The **request path** wraps every API route in two middlewares: the
//!   admission gate ([`limits`]) rejects over-limit identities before any
//!   work happens, and the tracker ([`tracking`]) measures each admitted
//!   request and hands a usage event to a background writer.
//!
//! ## Request Flow
//!
//! ```text
//! request → rate limiter → usage tracker → handler → service → Table → SQLite
//! ```
//!
//! Client-registry routes are open (they are how a caller obtains a key in
//! the first place); the national-ID routes require a valid key via the
//! [`auth::CurrentClient`] extractor. Every admitted request — anonymous or
//! not — produces exactly one usage row after its response is built.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use nidctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = nidctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     nidctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for the YAML/environment layering, including
//! the rate-limiter window and ceiling.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router, middleware::from_fn_with_state};
use bon::Builder;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod errors;
pub mod lifecycle;
pub mod limits;
pub mod national_id;
mod openapi;
pub mod services;
pub mod telemetry;
pub mod tracking;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers::clients::{
    create_client, delete_client, get_client, list_clients, update_client,
};
use crate::api::handlers::national_id::{validate_national_id, validate_national_id_bulk};
use crate::api::handlers::usage::list_usage;
use crate::limits::RateLimiter;
use crate::tracking::UsageRecorder;

pub use crate::config::Config;

/// Shared application state available to every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
    pub usage: UsageRecorder,
}

/// Get the database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Assemble the full router: API routes behind the admission gate and the
/// usage tracker, plus the operational endpoints (health, docs) outside
/// them.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/clients", post(create_client).get(list_clients))
        .route(
            "/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
        .route("/usage", get(list_usage))
        .route("/nid-egypt", post(validate_national_id))
        .route("/nid-egypt/bulk", post(validate_national_id_bulk))
        // Layer order matters: the limiter runs first, so rejected requests
        // are never tracked
        .layer(from_fn_with_state(state.clone(), tracking::track_requests))
        .layer(from_fn_with_state(state.clone(), limits::enforce_rate_limit))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

async fn connect_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub struct Application {
    router: Router,
    config: Config,
    shutdown_token: CancellationToken,
    recorder_handle: JoinHandle<()>,
}

impl Application {
    /// Create a new application instance: connect to the store, run
    /// migrations, and wire up state and routes.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting nidctl with configuration: {:#?}", config);

        let pool = connect_database(&config).await?;
        migrator().run(&pool).await?;

        Self::with_pool(config, pool).await
    }

    /// As [`new`](Self::new), but over an existing (already migrated) pool.
    pub async fn with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let shutdown_token = CancellationToken::new();
        let (usage, recorder_handle) =
            UsageRecorder::spawn(pool.clone(), shutdown_token.child_token());
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        let state = AppState::builder()
            .db(pool)
            .config(config.clone())
            .limiter(limiter)
            .usage(usage)
            .build();
        let router = build_router(state);

        Ok(Self {
            router,
            config,
            shutdown_token,
            recorder_handle,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application, shutting down gracefully — including
    /// draining queued usage records — when `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("nidctl listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        self.shutdown_token.cancel();
        let _ = self.recorder_handle.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_app_with_config, create_test_config};
    use axum::http::StatusCode;
    use serde_json::{Value as JsonValue, json};
    use std::time::Duration;

    async fn usage_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM api_usage")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    /// The recorder writes asynchronously; poll until it catches up.
    async fn wait_for_usage_rows(pool: &SqlitePool, expected: i64) {
        for _ in 0..100 {
            if usage_count(pool).await >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {expected} usage rows, found {}", usage_count(pool).await);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn health_endpoint_responds(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "ok");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn creating_a_client_returns_the_projection(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/clients").json(&json!({"name": "svc-a"})).await;
        response.assert_status(StatusCode::CREATED);

        let body: JsonValue = response.json();
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "svc-a");
        assert_eq!(body["description"], JsonValue::Null);
        let api_key = body["api_key"].as_str().unwrap();
        assert!(api_key.len() >= 64, "key too short: {api_key}");
        // The projection is exactly {id, name, description, api_key}
        assert_eq!(body.as_object().unwrap().len(), 4);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn duplicate_client_name_conflicts_and_creates_no_row(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;

        server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .assert_status(StatusCode::CREATED);
        let response = server.post("/clients").json(&json!({"name": "svc-a"})).await;
        response.assert_status(StatusCode::CONFLICT);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn listing_clients_paginates(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        for name in ["svc-a", "svc-b", "svc-c"] {
            server
                .post("/clients")
                .json(&json!({"name": name}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let page: Vec<JsonValue> = server.get("/clients?limit=2").await.json();
        assert_eq!(page.len(), 2);

        let rest: Vec<JsonValue> = server.get("/clients?offset=2&limit=2").await.json();
        assert_eq!(rest.len(), 1);

        // Offset past the record count yields an empty sequence, not an error
        let empty: Vec<JsonValue> = server.get("/clients?offset=50").await.json();
        assert!(empty.is_empty());

        let ordered: Vec<JsonValue> = server.get("/clients?order_by=-name").await.json();
        assert_eq!(ordered[0]["name"], "svc-c");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn retrieving_a_missing_client_is_not_found(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        server
            .get("/clients/42")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn updating_a_client_keeps_unset_fields(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a", "description": "first"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();

        let updated: JsonValue = server
            .patch(&format!("/clients/{id}"))
            .json(&json!({"description": "second"}))
            .await
            .json();
        assert_eq!(updated["name"], "svc-a");
        assert_eq!(updated["description"], "second");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn deleting_a_client_is_idempotent(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();

        let first: JsonValue = server.delete(&format!("/clients/{id}")).await.json();
        assert_eq!(first["deleted"], true);

        let second: JsonValue = server.delete(&format!("/clients/{id}")).await.json();
        assert_eq!(second["deleted"], false);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn national_id_requires_an_api_key(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        server
            .post("/nid-egypt")
            .json(&json!({"national_id": "29501010112345"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/nid-egypt")
            .authorization_bearer("sk-not-a-real-key")
            .json(&json!({"national_id": "29501010112345"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn national_id_validation_extracts_fields(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        let response = server
            .post("/nid-egypt")
            .authorization_bearer(&api_key)
            .json(&json!({"national_id": "29501010112345"}))
            .await;
        response.assert_status_ok();

        let body: JsonValue = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["is_valid"], true);
        assert_eq!(body["data"]["century"], 1900);
        assert_eq!(body["data"]["date_of_birth"]["year"], 1995);
        assert_eq!(body["data"]["location"]["governorate_name"], "Cairo");
        assert_eq!(body["data"]["gender"], "female");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn thirteen_digit_input_is_rejected_before_extraction(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        server
            .post("/nid-egypt")
            .authorization_bearer(&api_key)
            .json(&json!({"national_id": "2950101011234"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn bulk_validation_reports_per_item_results(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        let body: JsonValue = server
            .post("/nid-egypt/bulk")
            .authorization_bearer(&api_key)
            .json(&json!({"national_ids": ["29501010112345", "19501010112345", "bad"]}))
            .await
            .json();
        assert_eq!(body["total"], 3);
        assert_eq!(body["valid_count"], 1);
        assert_eq!(body["invalid_count"], 2);

        let over_limit: Vec<String> = (0..101).map(|i| format!("{i:014}")).collect();
        server
            .post("/nid-egypt/bulk")
            .authorization_bearer(&api_key)
            .json(&json!({"national_ids": over_limit}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn anonymous_requests_are_tracked_with_a_null_client(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        server.get("/clients").await.assert_status_ok();
        wait_for_usage_rows(&pool, 1).await;

        let (client_id, path): (Option<i64>, String) =
            sqlx::query_as("SELECT client_id, path FROM api_usage LIMIT 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(client_id, None);
        assert_eq!(path, "/clients");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn authenticated_requests_are_attributed_to_their_client(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        server
            .post("/nid-egypt")
            .authorization_bearer(&api_key)
            .json(&json!({"national_id": "29501010112345"}))
            .await
            .assert_status_ok();
        wait_for_usage_rows(&pool, 2).await;

        let attributed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_usage WHERE client_id = ? AND path = '/nid-egypt'",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(attributed, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn usage_listing_filters_by_client(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        server
            .post("/nid-egypt")
            .authorization_bearer(&api_key)
            .json(&json!({"national_id": "29501010112345"}))
            .await
            .assert_status_ok();
        wait_for_usage_rows(&pool, 2).await;

        let mine: Vec<JsonValue> = server
            .get(&format!("/usage?client_id={id}"))
            .await
            .json();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["path"], "/nid-egypt");
        assert_eq!(mine[0]["method"], "POST");
        assert_eq!(mine[0]["status_code"], 200);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn over_limit_requests_are_rejected_without_side_effects(pool: SqlitePool) {
        let mut config = create_test_config();
        config.rate_limit.max_requests = 3;
        let server = create_test_app_with_config(pool.clone(), config).await;

        for _ in 0..3 {
            server.get("/clients").await.assert_status_ok();
        }
        server
            .get("/clients")
            .await
            .assert_status(StatusCode::TOO_MANY_REQUESTS);

        // The rejected request never reached the tracker
        wait_for_usage_rows(&pool, 3).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(usage_count(&pool).await, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn deleting_a_client_cascades_its_usage_rows(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let created: JsonValue = server
            .post("/clients")
            .json(&json!({"name": "svc-a"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();
        let api_key = created["api_key"].as_str().unwrap().to_string();

        server
            .post("/nid-egypt")
            .authorization_bearer(&api_key)
            .json(&json!({"national_id": "29501010112345"}))
            .await
            .assert_status_ok();
        wait_for_usage_rows(&pool, 2).await;

        let deleted: JsonValue = server.delete(&format!("/clients/{id}")).await.json();
        assert_eq!(deleted["deleted"], true);

        let attributed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM api_usage WHERE client_id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(attributed, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn openapi_document_is_served(pool: SqlitePool) {
        let server = create_test_app(pool).await;
        let body: JsonValue = server.get("/api-docs/openapi.json").await.json();
        assert!(body["paths"]["/clients"].is_object());
        assert!(body["paths"]["/nid-egypt"].is_object());
    }
}
