//! Mapping of HTTP outcomes to `ApiError` kinds.
//!
//! | Condition                     | Kind             |
//! |-------------------------------|------------------|
//! | no key for the region         | Configuration    |
//! | 401, 403                      | Authentication   |
//! | 400                           | BadRequest       |
//! | any other non-2xx             | Transport        |
//! | connection or timeout failure | Transport        |
//! | 2xx without the expected path | UnexpectedFormat |

use crate::core::error::{ApiError, ApiErrorKind};
use std::fmt::Display;

/// Longest body excerpt kept in an `UnexpectedFormat` detail.
pub const MAX_FORMAT_DETAIL_CHARS: usize = 2000;

/// Classify a non-2xx response from an API call.
pub fn classify_status(status: u16, reason: &str, body: &str) -> ApiError {
    match status {
        401 => ApiError::new(
            ApiErrorKind::Authentication,
            format!(
                "401 Unauthorized. The API key is invalid or not properly configured. Error details: {}",
                body
            ),
        ),
        403 => ApiError::new(
            ApiErrorKind::Authentication,
            format!(
                "403 Forbidden. The API key is valid but has no access to this model. Error details: {}",
                body
            ),
        ),
        400 => ApiError::new(
            ApiErrorKind::BadRequest,
            format!(
                "400 Bad Request. The service rejected the request format. Error details: {}",
                body
            ),
        ),
        _ => ApiError::transport(format!("{} {}. Response: {}", status, reason, body)),
    }
}

/// Connection, TLS or timeout failure.
pub fn transport_failure(cause: impl Display) -> ApiError {
    ApiError::transport(format!("API request failed: {}", cause))
}

/// Non-2xx while downloading a result image.
pub fn download_failure(status: u16, reason: &str, url: &str) -> ApiError {
    ApiError::transport(format!("Image download failed: {} {} ({})", status, reason, url))
}

/// A 2xx body without the expected result.
pub fn unexpected_format(what: &str, body: &str) -> ApiError {
    ApiError::unexpected_format(format!(
        "Unexpected API response format ({}): {}",
        what,
        truncate_chars(body, MAX_FORMAT_DETAIL_CHARS)
    ))
}

/// Cut `text` to `max_chars` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
