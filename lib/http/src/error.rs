//! HTTP client construction errors.
//!
//! Request failures are reported through
//! [`ApiError`](affiliate_console_access::ApiError) instead.

use std::fmt;

/// Errors building an [`HttpApiClient`](crate::HttpApiClient).
#[derive(Debug)]
pub enum HttpClientError {
    /// The configured base URL is not an absolute http(s) URL.
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Error details.
        details: String,
    },
    /// The underlying HTTP client could not be built.
    BuildFailed {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl { url, details } => {
                write!(f, "invalid API base URL '{}': {}", url, details)
            }
            Self::BuildFailed { details } => {
                write!(f, "failed to build HTTP client: {}", details)
            }
        }
    }
}

impl std::error::Error for HttpClientError {}
