//! Egyptian national-ID validation and field extraction.
//!
//! A national ID is 14 digits: century indicator, two-digit year, month, day,
//! two-digit governorate code, four-digit sequence number, and a trailing
//! check digit. Extraction is pure; [`validate_and_extract`] folds every
//! sub-extraction failure into the result's error list instead of aborting,
//! so one bad segment still leaves the others populated.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Required length of a national ID, in ASCII digits
pub const NATIONAL_ID_LENGTH: usize = 14;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Invalid century indicator: {0}")]
    Century(char),

    #[error("Invalid date of birth: {0}")]
    DateOfBirth(String),

    #[error("Invalid governorate code: {0}")]
    Governorate(String),

    #[error("Failed to extract gender: {0}")]
    Gender(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Decoded birth-date segment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DateOfBirth {
    pub full_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub age: i32,
}

/// Birth governorate
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub governorate_code: String,
    pub governorate_name: String,
}

/// Everything extracted from one national ID, plus the accumulated errors.
/// `is_valid` holds exactly when the error list is empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NationalIdData {
    pub national_id: String,
    pub is_valid: bool,
    pub date_of_birth: Option<DateOfBirth>,
    pub gender: Option<Gender>,
    pub location: Option<Location>,
    pub sequence_number: Option<String>,
    pub century: Option<i32>,
    pub errors: Vec<String>,
}

/// Century from the leading digit: '2' ⇒ 1900, '3' ⇒ 2000.
pub fn extract_century(national_id: &str) -> Result<i32, ExtractionError> {
    match national_id.chars().next() {
        Some('2') => Ok(1900),
        Some('3') => Ok(2000),
        Some(other) => Err(ExtractionError::Century(other)),
        None => Err(ExtractionError::Century(' ')),
    }
}

/// Decode and validate the birth date, and compute the age as of today.
pub fn extract_date_of_birth(national_id: &str) -> Result<DateOfBirth, ExtractionError> {
    let century = extract_century(national_id)?;
    let year = century + segment(national_id, 1, 3)? as i32;
    let month = segment(national_id, 3, 5)?;
    let day = segment(national_id, 5, 7)?;

    let full_date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ExtractionError::DateOfBirth(format!("{year:04}-{month:02}-{day:02} is not a valid date"))
    })?;

    let today = Utc::now().date_naive();
    let mut age = today.year() - year;
    if (today.month(), today.day()) < (month, day) {
        age -= 1;
    }

    Ok(DateOfBirth {
        full_date,
        year,
        month,
        day,
        age,
    })
}

/// Governorate from digits 7..9.
pub fn extract_governorate(national_id: &str) -> Result<Location, ExtractionError> {
    let code = national_id
        .get(7..9)
        .ok_or_else(|| ExtractionError::Governorate("missing".to_string()))?;
    let name = governorate_name(code)
        .ok_or_else(|| ExtractionError::Governorate(code.to_string()))?;
    Ok(Location {
        governorate_code: code.to_string(),
        governorate_name: name.to_string(),
    })
}

/// Gender from the parity of the four-digit sequence number: odd ⇒ male.
pub fn extract_gender(national_id: &str) -> Result<Gender, ExtractionError> {
    let sequence = segment(national_id, 9, 13).map_err(|_| {
        ExtractionError::Gender("sequence number is not numeric".to_string())
    })?;
    Ok(if sequence % 2 == 1 {
        Gender::Male
    } else {
        Gender::Female
    })
}

/// Check-digit validation. The official algorithm is not publicly
/// documented; this accepts every value until one is supplied.
pub fn validate_checksum(_national_id: &str) -> bool {
    true
}

/// Run every extraction, folding failures into `errors`.
pub fn validate_and_extract(national_id: &str) -> NationalIdData {
    let mut errors = Vec::new();
    let mut data = NationalIdData {
        national_id: national_id.to_string(),
        is_valid: false,
        date_of_birth: None,
        gender: None,
        location: None,
        sequence_number: None,
        century: None,
        errors: Vec::new(),
    };

    match extract_date_of_birth(national_id) {
        Ok(date_of_birth) => {
            let today = Utc::now().date_naive();
            if date_of_birth.full_date > today {
                errors.push("Birth date cannot be in the future".to_string());
            }
            if date_of_birth.age > 150 {
                errors.push("Age exceeds reasonable limit".to_string());
            }
            data.date_of_birth = Some(date_of_birth);
        }
        Err(err) => errors.push(err.to_string()),
    }

    match extract_governorate(national_id) {
        Ok(location) => data.location = Some(location),
        Err(err) => errors.push(err.to_string()),
    }

    match extract_gender(national_id) {
        Ok(gender) => data.gender = Some(gender),
        Err(err) => errors.push(err.to_string()),
    }

    data.sequence_number = national_id.get(9..13).map(str::to_string);
    match extract_century(national_id) {
        Ok(century) => data.century = Some(century),
        // Already reported through the date-of-birth extraction
        Err(_) => {}
    }

    if !validate_checksum(national_id) {
        errors.push("Invalid checksum".to_string());
    }

    data.is_valid = errors.is_empty();
    data.errors = errors;
    data
}

fn segment(national_id: &str, start: usize, end: usize) -> Result<u32, ExtractionError> {
    national_id
        .get(start..end)
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| {
            ExtractionError::DateOfBirth(format!(
                "digits {start}..{end} are missing or not numeric"
            ))
        })
}

fn governorate_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "01" => "Cairo",
        "02" => "Alexandria",
        "03" => "Port Said",
        "04" => "Suez",
        "11" => "Damietta",
        "12" => "Dakahlia",
        "13" => "Sharqia",
        "14" => "Qalyubia",
        "15" => "Kafr El-Sheikh",
        "16" => "Gharbia",
        "17" => "Menoufia",
        "18" => "Beheira",
        "19" => "Ismailia",
        "21" => "Giza",
        "22" => "Beni Suef",
        "23" => "Fayoum",
        "24" => "Minya",
        "25" => "Asyut",
        "26" => "Sohag",
        "27" => "Qena",
        "28" => "Aswan",
        "29" => "Luxor",
        "31" => "Red Sea",
        "32" => "New Valley",
        "33" => "Matrouh",
        "34" => "North Sinai",
        "35" => "South Sinai",
        "88" => "Outside Egypt",
        _ => return None,
    };
    Some(name)
}
