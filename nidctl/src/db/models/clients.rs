//! Database model for service clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::models::clients::{ClientCreate, ClientUpdate};
use crate::db::record::{FieldDef, FieldMap, Record};
use crate::types::ClientId;

/// A registered service client. Owns its generated API key and, through the
/// store's cascade, every usage row recorded against that key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub description: Option<String>,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

static CLIENT_FIELDS: &[FieldDef] = &[
    FieldDef::new("id"),
    FieldDef::new("name").unique(),
    FieldDef::new("description"),
    FieldDef::new("api_key").unique(),
    FieldDef::new("created_at"),
];

impl Record for Client {
    type Id = ClientId;

    const TABLE: &'static str = "clients";

    fn fields() -> &'static [FieldDef] {
        CLIENT_FIELDS
    }
}

impl From<ClientCreate> for FieldMap {
    fn from(create: ClientCreate) -> Self {
        FieldMap::new()
            .with("name", create.name)
            .with("description", create.description)
    }
}

impl From<ClientUpdate> for FieldMap {
    fn from(update: ClientUpdate) -> Self {
        FieldMap::new()
            .with("name", update.name)
            .with("description", update.description)
    }
}
