//! API models for usage records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::usage::ApiUsage;
use crate::db::record::FieldMap;
use crate::types::{ClientId, UsageId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub id: UsageId,
    pub client_id: Option<ClientId>,
    pub path: String,
    pub method: String,
    pub status_code: i64,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<ApiUsage> for UsageResponse {
    fn from(usage: ApiUsage) -> Self {
        Self {
            id: usage.id,
            client_id: usage.client_id,
            path: usage.path,
            method: usage.method,
            status_code: usage.status_code,
            duration: usage.duration,
            timestamp: usage.timestamp,
        }
    }
}

/// Query parameters for listing usage records. Every filter is optional;
/// absent ones are stripped before the scan.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UsageQuery {
    pub client_id: Option<ClientId>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<i64>,

    /// Number of records to skip
    #[param(default = 0, minimum = 0)]
    pub offset: Option<i64>,

    /// Maximum number of records to return
    #[param(default = 100, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    /// Column to order by; prefix with '-' for descending
    pub order_by: Option<String>,
}

impl UsageQuery {
    /// The raw filter set, nulls included — the filter pipeline strips them.
    pub fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("client_id", self.client_id)
            .with("method", self.method.clone())
            .with("path", self.path.clone())
            .with("status_code", self.status_code)
    }
}
