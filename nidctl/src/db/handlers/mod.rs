//! Repository implementations for database access.
//!
//! [`repository::Table`] is the generic data-access layer every record type
//! shares; [`clients::Clients`] adds the client-specific lookups on top.
//!
//! Repositories borrow a `&mut SqliteConnection` for their lifetime — create
//! them from a pool connection or an open transaction, never from the pool
//! directly, so the caller controls the transaction scope.

pub mod clients;
pub mod repository;

pub use clients::Clients;
pub use repository::{Page, Table, MAX_LIMIT};
