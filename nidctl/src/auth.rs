//! API-key authentication.
//!
//! Callers present their key as `Authorization: Bearer <key>`. The
//! [`CurrentClient`] extractor resolves it to a client row; routes that embed
//! the extractor reject requests without a valid key. Identity resolution for
//! tracking purposes (where anonymous callers are allowed) uses
//! [`bearer_key`] directly instead.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::AppState;
use crate::db::handlers::Clients;
use crate::db::models::clients::Client;
use crate::errors::{Error, Result};

/// The API key presented on a request, if any.
pub fn bearer_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// The authenticated client for the current request.
#[derive(Debug, Clone)]
pub struct CurrentClient(pub Client);

impl FromRequestParts<AppState> for CurrentClient {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let api_key = bearer_key(&parts.headers).ok_or(Error::Unauthenticated {
            message: Some("Missing API key".to_string()),
        })?;

        let mut conn = state
            .db
            .acquire()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        let client = Clients::new(&mut conn)
            .get_by_api_key(api_key)
            .await?
            .ok_or(Error::Unauthenticated {
                message: Some("Invalid API key".to_string()),
            })?;

        Ok(CurrentClient(client))
    }
}
