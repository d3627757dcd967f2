//! Request-usage tracking.
//!
//! The [`track_requests`] middleware wraps every API request end-to-end: it
//! starts a timer, resolves the caller's identity from the presented API key
//! (no key, or a key that fails to resolve, means an anonymous row — the
//! request is tracked either way), runs the wrapped handler, then submits one
//! [`UsageEvent`] for the completed request.
//!
//! Persistence is decoupled from the request path: events go through a
//! bounded channel to a background writer task that owns its own pool handle.
//! A full channel or a failed insert is logged and dropped — recording can
//! never block, overwrite, or suppress the response that was already
//! produced.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::AppState;
use crate::auth::bearer_key;
use crate::db::handlers::Clients;
use crate::db::models::usage::UsageEvent;
use crate::services;
use crate::types::ClientId;

/// How many usage events can be queued before new ones are dropped
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Handle for submitting usage events to the background writer.
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    tx: mpsc::Sender<UsageEvent>,
}

impl UsageRecorder {
    /// Spawn the writer task and return the submission handle. The task runs
    /// until the channel closes or `shutdown` fires; shutdown drains events
    /// that were already queued.
    pub fn spawn(db: SqlitePool, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let handle = tokio::spawn(write_loop(db, rx, shutdown));
        (Self { tx }, handle)
    }

    /// Submit one event. Never blocks; overflow is logged and dropped.
    pub fn record(&self, event: UsageEvent) {
        if let Err(err) = self.tx.try_send(event) {
            warn!("dropping usage record: {err}");
        }
    }
}

async fn write_loop(
    db: SqlitePool,
    mut rx: mpsc::Receiver<UsageEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => persist(&db, event).await,
                    None => break,
                }
            }
            _ = shutdown.cancelled() => {
                rx.close();
                while let Ok(event) = rx.try_recv() {
                    persist(&db, event).await;
                }
                break;
            }
        }
    }
}

async fn persist(db: &SqlitePool, event: UsageEvent) {
    let result = async {
        let mut conn = db.acquire().await.map_err(anyhow::Error::from)?;
        services::usage()
            .create(&mut conn, event.into())
            .await
            .map_err(anyhow::Error::from)?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if let Err(err) = result {
        error!("failed to persist usage record: {err:#}");
    }
}

/// Middleware recording one usage row per completed request.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let api_key = bearer_key(request.headers()).map(str::to_owned);

    let client_id = match api_key {
        Some(key) => resolve_client(&state, &key).await,
        None => None,
    };

    let response = next.run(request).await;

    state.usage.record(UsageEvent {
        client_id,
        path,
        method,
        status_code: i64::from(response.status().as_u16()),
        duration: started.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    });

    response
}

/// Resolve an API key to a client id for attribution. Lookup failures fall
/// back to anonymous — tracking must not interfere with the request.
async fn resolve_client(state: &AppState, api_key: &str) -> Option<ClientId> {
    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(err) => {
            warn!("usage tracking could not acquire a connection: {err}");
            return None;
        }
    };
    match Clients::new(&mut conn).get_by_api_key(api_key).await {
        Ok(client) => client.map(|c| c.id),
        Err(err) => {
            warn!("usage tracking could not resolve API key: {err}");
            None
        }
    }
}
