//! Error types for the access crate.
//!
//! - `TokenError`: credential decoding failures
//! - `StorageError`: credential persistence failures
//! - `ApiError`: failures reported by the API collaborator
//! - `SessionError`: session transition failures surfaced to the UI
//!
//! Token and storage failures never escape the session store unclassified:
//! they are mapped into a `SessionError` and, where required, a logout.

use std::fmt;

/// Errors from credential decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The credential could not be parsed into claims.
    InvalidCredential { reason: String },
}

impl TokenError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { reason } => write!(f, "invalid credential: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Errors from the durable credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading the persisted state failed.
    ReadFailed { reason: String },
    /// Writing the persisted state failed.
    WriteFailed { reason: String },
    /// The persisted state exists but cannot be parsed.
    Corrupt { reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { reason } => write!(f, "failed to read credential store: {reason}"),
            Self::WriteFailed { reason } => {
                write!(f, "failed to write credential store: {reason}")
            }
            Self::Corrupt { reason } => write!(f, "credential store is corrupt: {reason}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors from the API collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered 401; the collaborator has already cleared the
    /// persisted credential.
    Unauthorized,
    /// No response: connection refused, DNS failure, or timeout.
    NetworkFailure { reason: String },
    /// The server answered with a 5xx status.
    ServerError { status: u16, message: Option<String> },
    /// The server answered with a non-401 4xx status and no usable body.
    Rejected { status: u16, message: Option<String> },
    /// The response body is not the `{success, data?, message?}` envelope.
    InvalidResponse { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NetworkFailure { reason } => write!(f, "network failure: {reason}"),
            Self::ServerError { status, message } => match message {
                Some(message) => write!(f, "server error {status}: {message}"),
                None => write!(f, "server error {status}"),
            },
            Self::Rejected { status, message } => match message {
                Some(message) => write!(f, "request rejected with {status}: {message}"),
                None => write!(f, "request rejected with {status}"),
            },
            Self::InvalidResponse { reason } => write!(f, "invalid API response: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors from session operations.
///
/// The `Display` text of the most recent failure is also recorded on the
/// session as its transient `error` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The credential is malformed.
    InvalidCredential { reason: String },
    /// The credential is expired or inside the expiry safety window.
    Expired,
    /// Nothing is persisted.
    NoCredential,
    /// The login or refresh response carried no credential.
    NoCredentialReturned,
    /// The API answered 401.
    Unauthorized,
    /// The API could not be reached.
    NetworkFailure { reason: String },
    /// The API failed with a 5xx status.
    ServerError { status: u16 },
    /// The API answered `success: false`, typically bad credentials.
    Rejected { message: String },
    /// Another login or refresh is still running.
    TransitionInProgress,
    /// The operation needs an authenticated session.
    NotAuthenticated,
    /// The credential store failed.
    Storage { reason: String },
    /// A request body could not be encoded as JSON.
    InvalidRequest { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { reason } => write!(f, "invalid credential: {reason}"),
            Self::Expired => write!(f, "session has expired"),
            Self::NoCredential => write!(f, "no stored credential"),
            Self::NoCredentialReturned => write!(f, "server did not return a credential"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NetworkFailure { reason } => write!(f, "network failure: {reason}"),
            Self::ServerError { status } => write!(f, "server error {status}"),
            Self::Rejected { message } => write!(f, "{message}"),
            Self::TransitionInProgress => write!(f, "another sign-in is already in progress"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Storage { reason } => write!(f, "credential storage failed: {reason}"),
            Self::InvalidRequest { reason } => write!(f, "could not encode request: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidCredential { reason } => Self::InvalidCredential { reason },
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        Self::Storage {
            reason: err.to_string(),
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::NetworkFailure { reason } => Self::NetworkFailure { reason },
            ApiError::ServerError { status, .. } => Self::ServerError { status },
            ApiError::Rejected { status, message } => Self::Rejected {
                message: message.unwrap_or_else(|| format!("request rejected with {status}")),
            },
            ApiError::InvalidResponse { reason } => Self::NetworkFailure { reason },
        }
    }
}
