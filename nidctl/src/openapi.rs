//! OpenAPI documentation configuration.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;
use crate::api::models::clients::{ClientCreate, ClientResponse, ClientUpdate};
use crate::api::models::national_id::{
    BulkNationalIdRequest, BulkValidationResponse, NationalIdRequest, ValidationResponse,
};
use crate::api::models::usage::UsageResponse;
use crate::lifecycle::Deleted;
use crate::national_id::{DateOfBirth, Gender, Location, NationalIdData};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "nidctl API",
        description = "Service-client registry and Egyptian national-ID validation"
    ),
    paths(
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::usage::list_usage,
        handlers::national_id::validate_national_id,
        handlers::national_id::validate_national_id_bulk,
    ),
    components(schemas(
        ClientCreate,
        ClientUpdate,
        ClientResponse,
        Deleted,
        UsageResponse,
        NationalIdRequest,
        BulkNationalIdRequest,
        ValidationResponse,
        BulkValidationResponse,
        NationalIdData,
        DateOfBirth,
        Location,
        Gender,
    )),
    modifiers(&ApiKeyScheme),
    tags(
        (name = "clients", description = "Service-client registry"),
        (name = "usage", description = "Per-request usage records"),
        (name = "national_id", description = "Egyptian national-ID validation"),
    )
)]
pub struct ApiDoc;

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
