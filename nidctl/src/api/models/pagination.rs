//! Shared pagination/ordering query parameters for list endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::db::handlers::repository::{MAX_LIMIT, Page};
use crate::lifecycle::ListParams;

/// Offset-based pagination with an optional ordering key. The limit is
/// clamped between 1 and 100 before it reaches the store.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of records to skip
    #[param(default = 0, minimum = 0)]
    pub offset: Option<i64>,

    /// Maximum number of records to return
    #[param(default = 100, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    /// Column to order by; prefix with '-' for descending
    pub order_by: Option<String>,
}

impl Pagination {
    pub fn page(&self) -> Page {
        Page::new(self.offset.unwrap_or(0), self.limit.unwrap_or(MAX_LIMIT))
    }

    pub fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page(),
            order_by: self.order_by.clone(),
        }
    }
}
