//! Concrete lifecycle services for the application's resources.
//!
//! Each constructor configures the generic [`Lifecycle`] pipelines with the
//! hooks that resource needs; handlers build a service per request and pass
//! it a connection explicitly.

use chrono::Utc;

use crate::api::models::clients::ClientResponse;
use crate::api::models::usage::UsageResponse;
use crate::crypto::generate_api_key;
use crate::db::models::clients::Client;
use crate::db::models::usage::ApiUsage;
use crate::lifecycle::Lifecycle;

/// Service-client operations. Creation injects the generated API key and the
/// creation timestamp after validation has passed.
pub fn clients() -> Lifecycle<Client, ClientResponse> {
    Lifecycle::new().pre_create(|fields| {
        fields.set("api_key", generate_api_key());
        fields.set("created_at", Utc::now());
    })
}

/// Usage-record operations. Default write validation is suppressed: the
/// client relation is nullable by design (anonymous callers are tracked
/// too), and usage rows carry no unique fields.
pub fn usage() -> Lifecycle<ApiUsage, UsageResponse> {
    Lifecycle::new().without_write_validation()
}
