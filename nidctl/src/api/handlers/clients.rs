//! HTTP handlers for the service-client registry.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::{
        clients::{ClientCreate, ClientResponse, ClientUpdate},
        pagination::Pagination,
    },
    errors::{Error, Result},
    lifecycle::Deleted,
    services,
    types::ClientId,
};

/// Register a new service client. The response carries the generated API
/// key — the only time it is ever returned.
#[utoipa::path(
    post,
    path = "/clients",
    tag = "clients",
    summary = "Create client",
    request_body = ClientCreate,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 409, description = "A client with this name already exists"),
        (status = 422, description = "Invalid client data"),
    )
)]
pub async fn create_client(
    State(state): State<AppState>,
    Json(data): Json<ClientCreate>,
) -> Result<(StatusCode, Json<ClientResponse>)> {
    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Client name cannot be empty".to_string(),
        });
    }

    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    let client = services::clients().create(&mut conn, data.into()).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// List registered clients with pagination and optional ordering.
#[utoipa::path(
    get,
    path = "/clients",
    tag = "clients",
    summary = "List clients",
    params(Pagination),
    responses(
        (status = 200, description = "Registered clients", body = [ClientResponse]),
    )
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<ClientResponse>>> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    let clients = services::clients()
        .list(&mut conn, pagination.list_params())
        .await?;
    Ok(Json(clients))
}

/// Fetch one client by id.
#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "clients",
    summary = "Get client",
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 200, description = "The client", body = ClientResponse),
        (status = 404, description = "No such client"),
    )
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    let client = services::clients().retrieve(&mut conn, id).await?;
    Ok(Json(client))
}

/// Update a client's name or description. Unset fields are left unchanged;
/// the uniqueness of a new name is re-validated.
#[utoipa::path(
    patch,
    path = "/clients/{id}",
    tag = "clients",
    summary = "Update client",
    params(("id" = i64, Path, description = "Client id")),
    request_body = ClientUpdate,
    responses(
        (status = 200, description = "Updated client", body = ClientResponse),
        (status = 404, description = "No such client"),
        (status = 409, description = "A client with this name already exists"),
    )
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
    Json(data): Json<ClientUpdate>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    let client = services::clients().update(&mut conn, id, data.into()).await?;
    Ok(Json(client))
}

/// Delete a client, cascading its usage records. Deleting an id that does
/// not exist reports `deleted: false` rather than failing.
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "clients",
    summary = "Delete client",
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 200, description = "Deletion outcome", body = Deleted),
    )
)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<Deleted>> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    let deleted = services::clients().delete(&mut conn, id).await?;
    Ok(Json(deleted))
}
