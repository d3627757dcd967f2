//! API request/response models for national-ID validation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::national_id::{NATIONAL_ID_LENGTH, NationalIdData};

/// Maximum number of ids accepted by the bulk endpoint
pub const MAX_BULK_IDS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NationalIdRequest {
    /// Egyptian national ID (14 digits)
    #[schema(example = "29501010112345")]
    pub national_id: String,
}

impl NationalIdRequest {
    /// Enforce the request shape — exactly 14 ASCII digits — before the
    /// extraction logic ever sees the value.
    pub fn validated(&self) -> Result<&str> {
        let national_id = self.national_id.trim();
        if national_id.len() != NATIONAL_ID_LENGTH
            || !national_id.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::Validation {
                message: "National ID must be exactly 14 digits".to_string(),
            });
        }
        Ok(national_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkNationalIdRequest {
    /// National IDs to validate, at most [`MAX_BULK_IDS`]
    pub national_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub success: bool,
    pub data: NationalIdData,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkValidationResponse {
    pub success: bool,
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub results: Vec<NationalIdData>,
}
