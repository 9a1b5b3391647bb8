//! Interface of the backend API collaborator.
//!
//! The session store talks to the backend only through [`ApiClient`]. An
//! implementation attaches the persisted bearer credential to outgoing
//! requests and, on HTTP 401, clears the credential and forces the console
//! back to its public entry point before returning
//! [`ApiError::Unauthorized`].

use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST` path exchanging email/password for a credential.
pub const LOGIN_PATH: &str = "/common/auth/login";
/// `POST` path starting the password reset email flow.
pub const FORGOT_PASSWORD_PATH: &str = "/common/auth/forgot-password";
/// `POST` path completing a password reset.
pub const RESET_PASSWORD_PATH: &str = "/common/auth/reset-password";
/// `POST` path exchanging the current credential for a fresh one.
pub const REFRESH_TOKEN_PATH: &str = "/common/auth/refresh-token";

/// Envelope every API endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    /// A successful response carrying `data`.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A `success: false` response carrying `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Returns `data` when it is a non-empty string.
    ///
    /// Auth endpoints return the credential this way.
    #[must_use]
    pub fn data_str(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Body of [`LOGIN_PATH`].
#[derive(Debug, Clone, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<&'a str>,
}

/// Body of [`FORGOT_PASSWORD_PATH`].
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordBody<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<&'a str>,
}

/// Body of [`RESET_PASSWORD_PATH`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody<'a> {
    pub email: &'a str,
    pub token: &'a str,
    pub new_password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<&'a str>,
}

/// Body of [`REFRESH_TOKEN_PATH`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody<'a> {
    pub refresh_token: &'a str,
}

/// HTTP collaborator used by the session store and data views.
///
/// Paths are relative to the API base URL. Query parameters for `get` and
/// `delete` are passed as a JSON object whose scalar members become the
/// query string.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError>;

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError>;

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError>;

    async fn patch(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError>;

    async fn delete(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError>;
}
