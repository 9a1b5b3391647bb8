//! Console bootstrap errors.

use std::fmt;

/// Errors raised while assembling the console.
#[derive(Debug)]
pub enum ConsoleError {
    /// Configuration could not be loaded.
    Config {
        /// Error details.
        details: String,
    },
    /// The API client could not be built.
    ApiClient,
    /// Restoring the persisted session failed for a reason other than a
    /// missing, expired, or malformed credential.
    SessionRestore {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {}", details),
            Self::ApiClient => write!(f, "failed to build API client"),
            Self::SessionRestore { details } => {
                write!(f, "failed to restore session: {}", details)
            }
        }
    }
}

impl std::error::Error for ConsoleError {}
