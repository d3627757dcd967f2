//! Database model for per-request usage records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::record::{FieldDef, FieldMap, Record};
use crate::types::{ClientId, UsageId};

/// One completed request, written by the tracking middleware. Immutable once
/// stored; rows only disappear when their owning client is deleted.
///
/// `client_id` is null for anonymous callers — requests without a resolvable
/// API key are still tracked.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiUsage {
    pub id: UsageId,
    pub client_id: Option<ClientId>,
    pub path: String,
    pub method: String,
    pub status_code: i64,
    /// Wall-clock seconds spent producing the response, fractional
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

static USAGE_FIELDS: &[FieldDef] = &[
    FieldDef::new("id"),
    FieldDef::new("client_id").references("clients", "id"),
    FieldDef::new("path"),
    FieldDef::new("method"),
    FieldDef::new("status_code"),
    FieldDef::new("duration"),
    FieldDef::new("timestamp"),
];

impl Record for ApiUsage {
    type Id = UsageId;

    const TABLE: &'static str = "api_usage";

    fn fields() -> &'static [FieldDef] {
        USAGE_FIELDS
    }
}

/// The measurement the tracking middleware hands to the background writer.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub client_id: Option<ClientId>,
    pub path: String,
    pub method: String,
    pub status_code: i64,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<UsageEvent> for FieldMap {
    fn from(event: UsageEvent) -> Self {
        FieldMap::new()
            .with("client_id", event.client_id)
            .with("path", event.path)
            .with("method", event.method)
            .with("status_code", event.status_code)
            .with("duration", event.duration)
            .with("timestamp", event.timestamp)
    }
}
