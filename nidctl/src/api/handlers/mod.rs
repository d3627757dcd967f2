//! Axum route handlers for all API endpoints.

pub mod clients;
pub mod national_id;
pub mod usage;
