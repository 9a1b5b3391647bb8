//! `reqwest`-backed API client.

use crate::config::HttpClientConfig;
use crate::error::HttpClientError;
use affiliate_console_access::{ApiClient, ApiError, ApiResponse, CredentialStore};
use affiliate_console_core::Subdomain;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument, warn};

/// Header naming the tenant a request is scoped to.
pub const SUBDOMAIN_HEADER: &str = "X-Subdomain";

/// Callback run after a 401 has cleared the persisted credential.
///
/// The console installs one that resets the session store, which sends the
/// user back to the login route.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// API client speaking HTTP to the console backend.
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    subdomain: RwLock<Option<Subdomain>>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("subdomain", &self.subdomain())
            .finish_non_exhaustive()
    }
}

impl HttpApiClient {
    /// Creates a client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL or
    /// the HTTP client cannot be built.
    pub fn new(
        config: &HttpClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> affiliate_console_core::Result<Self, HttpClientError> {
        let invalid = |details: String| HttpClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            details,
        };
        let parsed = url::Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())).into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| HttpClientError::BuildFailed {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            subdomain: RwLock::new(None),
            on_unauthorized: RwLock::new(None),
        })
    }

    /// Installs the hook run after a 401, replacing any previous one.
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self
            .on_unauthorized
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    /// Scopes subsequent requests to `subdomain`, or to none.
    pub fn set_subdomain(&self, subdomain: Option<Subdomain>) {
        *self.subdomain.write().unwrap_or_else(PoisonError::into_inner) = subdomain;
    }

    #[must_use]
    pub fn subdomain(&self) -> Option<Subdomain> {
        self.subdomain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn unauthorized(&self) -> ApiError {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "failed to erase credential after 401");
        }
        let hook = self
            .on_unauthorized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook();
        }
        ApiError::Unauthorized
    }

    #[instrument(skip(self, method, query, body), fields(method = %method))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let mut request = self.http.request(method, self.endpoint(path));

        match self.credentials.load() {
            Ok(Some(credential)) => request = request.bearer_auth(credential.as_str()),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "sending request without credential"),
        }
        if let Some(subdomain) = self.subdomain() {
            request = request.header(SUBDOMAIN_HEADER, subdomain.as_str());
        }
        if let Some(query) = query {
            request = request.query(&query_pairs(query));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "request failed");
            ApiError::NetworkFailure {
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("server answered 401, clearing credential");
            return Err(self.unauthorized());
        }

        let text = response.text().await.map_err(|e| ApiError::NetworkFailure {
            reason: e.to_string(),
        })?;
        let envelope = serde_json::from_str::<ApiResponse>(&text);
        debug!(status = status.as_u16(), "response received");

        if status.is_server_error() {
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                message: envelope.ok().and_then(|r| r.message),
            });
        }

        match envelope {
            Ok(response) if status.is_success() => Ok(response),
            Ok(response) => Ok(ApiResponse {
                success: false,
                ..response
            }),
            Err(_) if status.is_client_error() => Err(ApiError::Rejected {
                status: status.as_u16(),
                message: None,
            }),
            Err(e) => Err(ApiError::InvalidResponse {
                reason: e.to_string(),
            }),
        }
    }
}

/// Flattens a JSON object into query pairs. Arrays repeat their key; nulls
/// and nested objects are skipped.
fn query_pairs(query: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = query else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().filter_map(scalar).map(|v| (key.clone(), v)));
            }
            other => {
                if let Some(v) = scalar(other) {
                    pairs.push((key.clone(), v));
                }
            }
        }
    }
    pairs
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, None, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::PUT, path, None, Some(body)).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::PATCH, path, None, Some(body)).await
    }

    async fn delete(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.send(Method::DELETE, path, query, None).await
    }
}
