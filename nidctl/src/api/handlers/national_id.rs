//! HTTP handlers for Egyptian national-ID validation.

use axum::response::Json;
use tracing::info;

use crate::{
    api::models::national_id::{
        BulkNationalIdRequest, BulkValidationResponse, MAX_BULK_IDS, NationalIdRequest,
        ValidationResponse,
    },
    auth::CurrentClient,
    errors::{Error, Result},
    national_id,
};

/// Validate one Egyptian national ID and extract all available data:
/// date of birth, gender, birth governorate, and validity status.
#[utoipa::path(
    post,
    path = "/nid-egypt",
    tag = "national_id",
    summary = "Validate national ID",
    request_body = NationalIdRequest,
    responses(
        (status = 200, description = "Validation result", body = ValidationResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 422, description = "Input is not a 14-digit number"),
    ),
    security(("api_key" = []))
)]
pub async fn validate_national_id(
    CurrentClient(client): CurrentClient,
    Json(request): Json<NationalIdRequest>,
) -> Result<Json<ValidationResponse>> {
    let national_id = request.validated()?;
    info!(client = %client.name, "validating national ID");

    let data = national_id::validate_and_extract(national_id);
    Ok(Json(ValidationResponse {
        success: true,
        data,
        message: "Validation completed successfully".to_string(),
    }))
}

/// Validate up to 100 national IDs in one call. Malformed entries are
/// reported per-item instead of failing the batch.
#[utoipa::path(
    post,
    path = "/nid-egypt/bulk",
    tag = "national_id",
    summary = "Validate national IDs in bulk",
    request_body = BulkNationalIdRequest,
    responses(
        (status = 200, description = "Per-ID validation results", body = BulkValidationResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 422, description = "Too many IDs"),
    ),
    security(("api_key" = []))
)]
pub async fn validate_national_id_bulk(
    CurrentClient(client): CurrentClient,
    Json(request): Json<BulkNationalIdRequest>,
) -> Result<Json<BulkValidationResponse>> {
    if request.national_ids.len() > MAX_BULK_IDS {
        return Err(Error::Validation {
            message: format!("Maximum {MAX_BULK_IDS} IDs per request"),
        });
    }
    info!(
        client = %client.name,
        count = request.national_ids.len(),
        "validating national IDs in bulk"
    );

    let results: Vec<_> = request
        .national_ids
        .iter()
        .map(|raw| {
            let shaped = NationalIdRequest {
                national_id: raw.clone(),
            };
            match shaped.validated() {
                Ok(national_id) => national_id::validate_and_extract(national_id),
                Err(err) => national_id::NationalIdData {
                    national_id: raw.clone(),
                    is_valid: false,
                    date_of_birth: None,
                    gender: None,
                    location: None,
                    sequence_number: None,
                    century: None,
                    errors: vec![err.user_message()],
                },
            }
        })
        .collect();

    let valid_count = results.iter().filter(|r| r.is_valid).count();
    Ok(Json(BulkValidationResponse {
        success: true,
        total: results.len(),
        valid_count,
        invalid_count: results.len() - valid_count,
        results,
    }))
}
