//! Database layer for data persistence and access.
//!
//! Built on SQLx over SQLite, following the repository pattern:
//!
//! ```text
//! handlers (API)  →  db::handlers (repositories)  →  db::models (records)  →  store
//! ```
//!
//! - [`record`]: the `Record` trait, per-type field registries, and the
//!   dynamic `FieldMap`/`Value` payload types
//! - [`handlers`]: the generic `Table` repository and domain repositories
//! - [`models`]: row structs matching the table schemas
//! - [`errors`]: database-specific error types
//!
//! Migrations live in `migrations/` and are embedded via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
pub mod record;
