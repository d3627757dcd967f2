//! API request/response models for service clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::clients::Client;
use crate::types::ClientId;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Public projection of a client. The generated key is included — this is
/// the only place callers ever see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientResponse {
    pub id: ClientId,
    pub name: String,
    pub description: Option<String>,
    pub api_key: String,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            description: client.description,
            api_key: client.api_key,
        }
    }
}
