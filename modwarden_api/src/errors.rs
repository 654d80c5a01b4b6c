//! Error types for the API client.

use std::time::Duration;

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error or timeout).
    #[error("Request failed")]
    RequestFailed,
    /// A successful response carried a body that does not match the expected type.
    #[error("Failed to parse response")]
    ParseFailed,
    /// Discord answered 429; `retry_after` is the server-suggested wait.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    /// The requested resource does not exist or is not visible to the bot.
    #[error("Resource not found")]
    NotFound,
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
}

impl Error {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RequestFailed | Error::RateLimited { .. } => true,
            Error::HttpStatus { status, .. } => *status >= 500,
            Error::NotFound | Error::ParseFailed => false,
        }
    }
}
