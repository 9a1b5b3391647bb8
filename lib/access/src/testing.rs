//! Test support: credential minting and a scripted API client.
//!
//! Available to this crate's unit tests and, through the `testing` feature,
//! to downstream crates' tests and mock servers.

use crate::api::{ApiClient, ApiResponse};
use crate::error::ApiError;
use crate::role::Role;
use crate::token::{Claims, encode_for_tests};
use affiliate_console_core::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mints a credential carrying `claims`, signed with a fixed test key.
///
/// [`decode`](crate::token::decode) reproduces `claims` exactly as long as
/// the timestamps have whole-second precision.
#[must_use]
pub fn issue_token(claims: &Claims) -> String {
    encode_for_tests(claims)
}

/// Builds claims for a user of `role` expiring at `expires_at`.
///
/// Timestamps are truncated to whole seconds so they survive encoding.
#[must_use]
pub fn claims_for(role: Role, expires_at: DateTime<Utc>) -> Claims {
    let second = Duration::seconds(1);
    let now = Utc::now();
    Claims {
        subject: UserId::new(format!("user-{role}")),
        name: format!("Test {role}"),
        email: format!("{role}@example.test"),
        role,
        permissions: None,
        issued_at: Some(now.duration_trunc(second).unwrap_or(now)),
        expires_at: expires_at.duration_trunc(second).unwrap_or(expires_at),
    }
}

/// A request observed by [`MockApiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    /// Request body, or query object for `get`/`delete`.
    pub payload: Option<Value>,
}

type Scripted = Result<ApiResponse, ApiError>;

/// API client answering from per-path scripts.
///
/// Responses queued with [`respond`](Self::respond) are consumed in order;
/// the last one for a path is repeated once the queue would run empty.
/// Unscripted paths fail with [`ApiError::NetworkFailure`].
#[derive(Debug, Default)]
pub struct MockApiClient {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<std::time::Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response, to hold a transition open.
    #[must_use]
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a response for `path`.
    pub fn respond(&self, path: &str, response: Scripted) {
        lock(&self.scripts)
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Returns every request seen so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    async fn answer(
        &self,
        method: &'static str,
        path: &str,
        payload: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        lock(&self.requests).push(RecordedRequest {
            method,
            path: path.to_string(),
            payload,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = lock(&self.scripts);
        match scripts.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(unscripted(path))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(unscripted(path))),
            None => Err(unscripted(path)),
        }
    }
}

fn unscripted(path: &str) -> ApiError {
    ApiError::NetworkFailure {
        reason: format!("no scripted response for {path}"),
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.answer("GET", path, query.cloned()).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.answer("POST", path, Some(body.clone())).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.answer("PUT", path, Some(body.clone())).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.answer("PATCH", path, Some(body.clone())).await
    }

    async fn delete(&self, path: &str, query: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.answer("DELETE", path, query.cloned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::decode;
    use serde_json::json;

    #[test]
    fn issued_token_roundtrips_claims() {
        let claims = claims_for(Role::Manager, Utc::now() + Duration::minutes(30));
        assert_eq!(decode(&issue_token(&claims)).expect("decode"), claims);
    }

    #[tokio::test]
    async fn scripts_are_consumed_then_repeated() {
        let api = MockApiClient::new();
        api.respond("/a", Ok(ApiResponse::ok(json!(1))));
        api.respond("/a", Ok(ApiResponse::ok(json!(2))));

        let first = api.get("/a", None).await.expect("first");
        let second = api.get("/a", None).await.expect("second");
        let third = api.get("/a", None).await.expect("third");
        assert_eq!(first.data, Some(json!(1)));
        assert_eq!(second.data, Some(json!(2)));
        assert_eq!(third.data, Some(json!(2)));
    }

    #[tokio::test]
    async fn unscripted_path_is_network_failure_and_recorded() {
        let api = MockApiClient::new();
        let err = api
            .post("/missing", &json!({"k": "v"}))
            .await
            .expect_err("unscripted");
        assert!(matches!(err, ApiError::NetworkFailure { .. }));
        assert_eq!(
            api.requests(),
            vec![RecordedRequest {
                method: "POST",
                path: "/missing".to_string(),
                payload: Some(json!({"k": "v"})),
            }]
        );
    }
}
