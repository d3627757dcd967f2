//! HTTP handlers for usage records.

use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::{
    AppState,
    api::models::usage::{UsageQuery, UsageResponse},
    db::handlers::repository::{MAX_LIMIT, Page},
    errors::{Error, Result},
    lifecycle::ListParams,
    services,
};

/// List recorded requests, optionally narrowed by client, method, path, or
/// status code. Absent filters are stripped; the remaining keys are
/// validated strictly against the usage record's columns.
#[utoipa::path(
    get,
    path = "/usage",
    tag = "usage",
    summary = "List usage records",
    params(UsageQuery),
    responses(
        (status = 200, description = "Matching usage records", body = [UsageResponse]),
        (status = 400, description = "Unknown filter field"),
    )
)]
pub async fn list_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<Vec<UsageResponse>>> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;

    let params = ListParams {
        page: Page::new(query.offset.unwrap_or(0), query.limit.unwrap_or(MAX_LIMIT)),
        order_by: query.order_by.clone(),
    };
    let records = services::usage()
        .filter_params(&mut conn, query.to_fields(), params)
        .await?;
    Ok(Json(records))
}
