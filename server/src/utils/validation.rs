use chrono::NaiveTime;

use crate::utils::error::AppError;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_LOCATION_LEN: usize = 300;
pub const MAX_POST_LEN: usize = 2000;
pub const MAX_URL_LEN: usize = 2048;

const TIME_FORMAT_MESSAGE: &str = "Time must be in format HH:MM";

/// Parses a 24-hour `HH:MM` value. Both digits are required on each side.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, AppError> {
    let invalid = || AppError::ValidationError(TIME_FORMAT_MESSAGE.to_string());

    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    let hours = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
    let minutes = u32::from(digits[2] - b'0') * 10 + u32::from(digits[3] - b'0');
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Trims the value and maps blank strings to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    check_length(field, trimmed, max_len)?;
    Ok(trimmed.to_string())
}

pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    let normalized = normalize_optional(value);
    if let Some(text) = &normalized {
        check_length(field, text, max_len)?;
    }
    Ok(normalized)
}

fn check_length(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.chars().count() > max_len {
        return Err(AppError::ValidationError(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_coordinate(field: &str, value: Option<f64>, limit: f64) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_finite() || v.abs() > limit => Err(AppError::ValidationError(format!(
            "{field} must be between -{limit} and {limit}"
        ))),
        _ => Ok(()),
    }
}
