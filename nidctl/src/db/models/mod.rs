//! Database record structures matching table schemas.
//!
//! Each model derives `sqlx::FromRow`, implements [`crate::db::record::Record`]
//! with its static field registry, and provides `From` conversions that turn
//! API payloads into the [`crate::db::record::FieldMap`]s the repositories
//! consume. Database models stay distinct from API models so storage and API
//! representations can evolve independently.

pub mod clients;
pub mod usage;
