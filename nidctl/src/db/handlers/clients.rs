//! Domain queries for service clients.
//!
//! Generic CRUD lives in [`Table`]; this repository adds the lookups keyed on
//! something other than the primary key.

use sqlx::SqliteConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Table;
use crate::db::models::clients::Client;
use crate::db::record::FieldMap;

pub struct Clients<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Clients<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Resolve a presented API key to its client, if any. Used by the
    /// authentication extractor and by the tracking middleware's identity
    /// resolution.
    #[instrument(skip(self, api_key), err)]
    pub async fn get_by_api_key(&mut self, api_key: &str) -> Result<Option<Client>> {
        let mut probe = FieldMap::new();
        probe.set("api_key", api_key);
        Table::<Client>::new(self.db).first(&probe).await
    }
}
