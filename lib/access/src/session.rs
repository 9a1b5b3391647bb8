//! Session state and the session store.
//!
//! A [`Session`] is a snapshot of who is signed in to the console. The
//! [`SessionStore`] owns the live session and drives its lifecycle:
//!
//! ```text
//! unauthenticated --login--> authenticating --ok--> authenticated
//!        ^                         |                  |   |   |
//!        +---------- error --------+                  |   |   |
//!        +------------------ logout / refresh failure-+   |   |
//! expired <------------------ expire_if_needed -----------+   |
//!                    refresh ok (credential replaced) --------+
//! ```
//!
//! Bootstrap goes straight to `authenticated` through [`SessionStore::initialize`]
//! when a persisted credential is still valid.

use crate::api::{
    ApiClient, FORGOT_PASSWORD_PATH, ForgotPasswordBody, LOGIN_PATH, LoginBody,
    REFRESH_TOKEN_PATH, RESET_PASSWORD_PATH, RefreshBody, ResetPasswordBody,
};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::permission::{self, PermissionSet};
use crate::role::Role;
use crate::storage::CredentialStore;
use crate::token::{self, Claims, Credential};
use affiliate_console_core::{Subdomain, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Unauthenticated,
    /// A login is in flight.
    Authenticating,
    Authenticated,
    /// The credential ran out while the console was open.
    Expired,
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.subject.clone(),
            name: claims.name.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// Snapshot of the console session.
///
/// Sessions are only built through the per-state constructors, which keep
/// `status == Authenticated` equivalent to having both a user and a
/// permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    user: Option<SessionUser>,
    permissions: Option<PermissionSet>,
    subdomain: Option<Subdomain>,
    expires_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl Session {
    /// The initial, signed-out session.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
            permissions: None,
            subdomain: None,
            expires_at: None,
            error: None,
        }
    }

    /// A session whose login is in flight for `subdomain`.
    #[must_use]
    pub fn authenticating(subdomain: Option<Subdomain>) -> Self {
        Self {
            status: SessionStatus::Authenticating,
            subdomain,
            ..Self::unauthenticated()
        }
    }

    /// A signed-in session.
    #[must_use]
    pub fn authenticated(
        user: SessionUser,
        permissions: PermissionSet,
        subdomain: Option<Subdomain>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: Some(user),
            permissions: Some(permissions),
            subdomain,
            expires_at: Some(expires_at),
            error: None,
        }
    }

    /// A session whose credential expired while in use.
    #[must_use]
    pub fn expired() -> Self {
        Self {
            status: SessionStatus::Expired,
            ..Self::unauthenticated()
        }
    }

    /// Attaches a display message for the last failed operation.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Returns the signed-in user, present only when authenticated.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Returns the cached permission set, present only when authenticated.
    #[must_use]
    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    /// Returns the tenant every API call is scoped to.
    #[must_use]
    pub fn subdomain(&self) -> Option<&Subdomain> {
        self.subdomain.as_ref()
    }

    /// Returns when the current credential expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the message of the last failed operation, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true if the session holds `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|set| permission::has_permission(set, permission))
    }

    /// Returns true if the session holds any of `required` (or `required` is empty).
    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|set| permission::has_any_permission(set, required))
    }

    /// Returns true if the session holds all of `required`.
    #[must_use]
    pub fn has_all_permissions<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|set| permission::has_all_permissions(set, required))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

/// Credentials submitted from the login form.
#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Tenant to sign in to; falls back to the configured default.
    pub subdomain: Option<Subdomain>,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            subdomain: None,
        }
    }

    #[must_use]
    pub fn with_subdomain(mut self, subdomain: Subdomain) -> Self {
        self.subdomain = Some(subdomain);
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("subdomain", &self.subdomain)
            .finish()
    }
}

/// Changes to the cached identity after a profile edit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Lowercases and trims an email address the way the backend stores it.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn request_body(body: &impl Serialize) -> Result<serde_json::Value, SessionError> {
    serde_json::to_value(body).map_err(|e| SessionError::InvalidRequest {
        reason: e.to_string(),
    })
}

/// Owner of the console session.
///
/// Shared by `Arc` between views, the access guard's callers, and the HTTP
/// client's unauthorized hook. Session reads and resets are synchronous;
/// `login` and `refresh` are serialized by a transition gate so an
/// overlapping attempt fails fast instead of interleaving.
pub struct SessionStore {
    api: Arc<dyn ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    config: SessionConfig,
    state: RwLock<Session>,
    transition: Mutex<()>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store in the unauthenticated state.
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiClient>,
        credentials: Arc<dyn CredentialStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            config,
            state: RwLock::new(Session::unauthenticated()),
            transition: Mutex::new(()),
        }
    }

    /// Returns a copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the persisted credential, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the credential store fails.
    pub fn credential(&self) -> Result<Option<Credential>, SessionError> {
        Ok(self.credentials.load()?)
    }

    fn replace(&self, session: Session) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Records `err` on the current session without changing its state.
    fn note_error(&self, err: &SessionError) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .error = Some(err.to_string());
    }

    fn clear_credential(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "failed to erase persisted credential");
        }
    }

    /// Restores the session from the persisted credential at bootstrap.
    ///
    /// No network call is made. A credential that is expired, expires within
    /// the configured safety window, or cannot be decoded is erased.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoCredential`] when nothing is persisted; callers
    ///   treat this as "stay signed out".
    /// - [`SessionError::Expired`] or [`SessionError::InvalidCredential`]
    ///   when the persisted credential was discarded.
    /// - [`SessionError::TransitionInProgress`] while a login or refresh runs.
    #[instrument(skip_all)]
    pub async fn initialize(&self) -> Result<Session, SessionError> {
        let _transition = self
            .transition
            .try_lock()
            .map_err(|_| SessionError::TransitionInProgress)?;

        let credential = match self.credentials.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!("no persisted credential");
                self.replace(Session::unauthenticated());
                return Err(SessionError::NoCredential);
            }
            Err(e) => {
                let err = SessionError::from(e);
                self.replace(Session::unauthenticated().with_error(err.to_string()));
                return Err(err);
            }
        };

        let claims = match token::decode(credential.as_str()) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "discarding undecodable persisted credential");
                self.clear_credential();
                let err = SessionError::from(e);
                self.replace(Session::unauthenticated().with_error(err.to_string()));
                return Err(err);
            }
        };

        if token::expires_within(&claims, Utc::now(), self.config.expiry_window()) {
            info!(expires_at = %claims.expires_at, "persisted credential expired or expiring");
            self.clear_credential();
            let err = SessionError::Expired;
            self.replace(Session::unauthenticated().with_error(err.to_string()));
            return Err(err);
        }

        let session = self.establish(&claims, self.config.default_subdomain.clone());
        info!(user_id = %claims.subject, role = %claims.role, "session restored");
        Ok(session)
    }

    /// Signs in with email and password.
    ///
    /// The email is trimmed and lowercased before it is sent. On success the
    /// returned credential is persisted and the session becomes
    /// authenticated; on failure it returns to unauthenticated with the
    /// error recorded and no credential persisted.
    ///
    /// # Errors
    ///
    /// - [`SessionError::TransitionInProgress`] while another login or
    ///   refresh runs (the running one is unaffected).
    /// - [`SessionError::Rejected`] when the server answers `success: false`.
    /// - [`SessionError::NoCredentialReturned`], [`SessionError::InvalidCredential`],
    ///   or [`SessionError::Expired`] for an unusable credential.
    /// - The API failure otherwise.
    #[instrument(skip_all, fields(subdomain = tracing::field::Empty))]
    pub async fn login(&self, request: LoginRequest) -> Result<Session, SessionError> {
        let _transition = self
            .transition
            .try_lock()
            .map_err(|_| SessionError::TransitionInProgress)?;

        let email = normalize_email(&request.email);
        let subdomain = request
            .subdomain
            .or_else(|| self.config.default_subdomain.clone());
        if let Some(subdomain) = &subdomain {
            tracing::Span::current().record("subdomain", subdomain.as_str());
        }

        let body = request_body(&LoginBody {
            email: &email,
            password: &request.password,
            subdomain: subdomain.as_ref().map(Subdomain::as_str),
        })?;

        self.replace(Session::authenticating(subdomain.clone()));

        match self.authenticate(LOGIN_PATH, &body).await {
            Ok(claims) => {
                let session = self.establish(&claims, subdomain);
                info!(user_id = %claims.subject, role = %claims.role, "signed in");
                Ok(session)
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.clear_credential();
                self.replace(Session::unauthenticated().with_error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Exchanges the current credential for a fresh one.
    ///
    /// Any failure forces a full logout: the persisted credential is erased
    /// and every session field reset.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoCredential`] when there is nothing to refresh.
    /// - [`SessionError::TransitionInProgress`] while a login or refresh runs.
    /// - Any failure of the login pipeline.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Session, SessionError> {
        let _transition = self
            .transition
            .try_lock()
            .map_err(|_| SessionError::TransitionInProgress)?;

        let current = match self.credentials.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => return Err(self.force_logout(SessionError::NoCredential)),
            Err(e) => return Err(self.force_logout(e.into())),
        };
        let subdomain = self.snapshot().subdomain;

        let body = match request_body(&RefreshBody {
            refresh_token: current.as_str(),
        }) {
            Ok(body) => body,
            Err(err) => return Err(self.force_logout(err)),
        };

        match self.authenticate(REFRESH_TOKEN_PATH, &body).await {
            Ok(claims) => {
                let session = self.establish(&claims, subdomain);
                debug!(expires_at = %claims.expires_at, "credential refreshed");
                Ok(session)
            }
            Err(err) => Err(self.force_logout(err)),
        }
    }

    fn force_logout(&self, err: SessionError) -> SessionError {
        warn!(error = %err, "refresh failed, signing out");
        self.clear_credential();
        self.replace(Session::unauthenticated().with_error(err.to_string()));
        err
    }

    /// Signs out: erases the persisted credential and resets the session.
    ///
    /// Idempotent, and safe to call from the HTTP client's unauthorized hook.
    #[instrument(skip_all)]
    pub fn logout(&self) {
        self.clear_credential();
        let previous = std::mem::take(
            &mut *self.state.write().unwrap_or_else(PoisonError::into_inner),
        );
        if let Some(user) = previous.user {
            info!(user_id = %user.id, "signed out");
        }
    }

    /// Moves an authenticated session whose credential has run out to
    /// `expired`, erasing the credential. Returns true if it did.
    pub fn expire_if_needed(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let expired = state.is_authenticated() && state.expires_at.is_some_and(|exp| exp <= now);
        if expired {
            *state = Session::expired();
            drop(state);
            self.clear_credential();
            info!("session expired");
        }
        expired
    }

    /// Updates the cached identity after the user edited their profile.
    ///
    /// Role and permissions are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] unless signed in.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<Session, SessionError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(user) = state.user.as_mut() else {
            return Err(SessionError::NotAuthenticated);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = normalize_email(&email);
        }
        Ok(state.clone())
    }

    /// Requests a password reset email.
    ///
    /// Returns the server's confirmation message, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] or the API failure; the message is
    /// also recorded on the session.
    #[instrument(skip_all)]
    pub async fn forgot_password(
        &self,
        email: &str,
        subdomain: Option<Subdomain>,
    ) -> Result<Option<String>, SessionError> {
        let email = normalize_email(email);
        let subdomain = subdomain.or_else(|| self.config.default_subdomain.clone());
        let body = request_body(&ForgotPasswordBody {
            email: &email,
            subdomain: subdomain.as_ref().map(Subdomain::as_str),
        })?;
        self.post_checked(FORGOT_PASSWORD_PATH, &body).await
    }

    /// Completes a password reset with the emailed `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] or the API failure; the message is
    /// also recorded on the session.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        email: &str,
        reset_token: &str,
        new_password: &str,
        subdomain: Option<Subdomain>,
    ) -> Result<Option<String>, SessionError> {
        let email = normalize_email(email);
        let subdomain = subdomain.or_else(|| self.config.default_subdomain.clone());
        let body = request_body(&ResetPasswordBody {
            email: &email,
            token: reset_token,
            new_password,
            subdomain: subdomain.as_ref().map(Subdomain::as_str),
        })?;
        self.post_checked(RESET_PASSWORD_PATH, &body).await
    }

    async fn post_checked(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Option<String>, SessionError> {
        let result = match self.api.post(path, body).await {
            Ok(response) if response.success => Ok(response.message),
            Ok(response) => Err(SessionError::Rejected {
                message: response
                    .message
                    .unwrap_or_else(|| "request was rejected".to_string()),
            }),
            Err(e) => Err(SessionError::from(e)),
        };
        if let Err(err) = &result {
            self.note_error(err);
        }
        result
    }

    /// Posts to an auth endpoint and validates the returned credential.
    ///
    /// The credential is persisted only once it decodes and is unexpired.
    async fn authenticate(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Claims, SessionError> {
        let response = self.api.post(path, body).await?;
        if !response.success {
            return Err(SessionError::Rejected {
                message: response
                    .message
                    .unwrap_or_else(|| "authentication failed".to_string()),
            });
        }

        let raw = response
            .data_str()
            .ok_or(SessionError::NoCredentialReturned)?;
        let credential = Credential::new(raw.trim());
        let claims = token::decode(credential.as_str())?;
        if token::is_expired(&claims, Utc::now()) {
            return Err(SessionError::Expired);
        }

        self.credentials.save(&credential)?;
        Ok(claims)
    }

    fn establish(&self, claims: &Claims, subdomain: Option<Subdomain>) -> Session {
        let permissions = permission::derive_permissions(claims.role, claims.permissions.as_deref());
        let session = Session::authenticated(
            SessionUser::from(claims),
            permissions,
            subdomain,
            claims.expires_at,
        );
        self.replace(session.clone());
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResponse;
    use crate::error::ApiError;
    use crate::storage::MemoryCredentialStore;
    use crate::testing::{MockApiClient, claims_for, issue_token};
    use chrono::Duration;
    use serde_json::json;

    struct Harness {
        api: Arc<MockApiClient>,
        credentials: Arc<MemoryCredentialStore>,
        store: SessionStore,
    }

    fn harness_with(api: MockApiClient, credentials: MemoryCredentialStore) -> Harness {
        let api = Arc::new(api);
        let credentials = Arc::new(credentials);
        let store = SessionStore::new(api.clone(), credentials.clone(), SessionConfig::default());
        Harness {
            api,
            credentials,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(MockApiClient::new(), MemoryCredentialStore::new())
    }

    fn token(role: Role, expires_in: Duration) -> String {
        issue_token(&claims_for(role, Utc::now() + expires_in))
    }

    fn assert_invariant(session: &Session) {
        assert_eq!(
            session.is_authenticated(),
            session.user().is_some() && session.permissions().is_some(),
            "status/user/permissions invariant violated: {session:?}"
        );
    }

    fn persisted(h: &Harness) -> Option<Credential> {
        h.credentials.load().expect("load")
    }

    #[tokio::test]
    async fn login_derives_catalog_permissions_for_admin() {
        let h = harness();
        let issued = token(Role::Admin, Duration::hours(1));
        h.api.respond(LOGIN_PATH, Ok(ApiResponse::ok(json!(issued.clone()))));

        let session = h
            .store
            .login(LoginRequest::new(" A@X.com ", "p").with_subdomain(Subdomain::new("acme")))
            .await
            .expect("login");

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.permissions(), Some(&permission::permissions_for(Role::Admin)));
        assert_eq!(session.role(), Some(Role::Admin));
        assert_eq!(session.subdomain(), Some(&Subdomain::new("acme")));
        assert_eq!(session.error(), None);
        assert_invariant(&session);
        assert_eq!(persisted(&h), Some(Credential::new(issued)));

        let requests = h.api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, LOGIN_PATH);
        assert_eq!(
            requests[0].payload,
            Some(json!({"email": "a@x.com", "password": "p", "subdomain": "acme"}))
        );
    }

    #[tokio::test]
    async fn login_prefers_server_supplied_permissions() {
        let h = harness();
        let mut claims = claims_for(Role::Publisher, Utc::now() + Duration::hours(1));
        claims.permissions = Some(vec!["reports:view".to_string(), "users:delete".to_string()]);
        h.api
            .respond(LOGIN_PATH, Ok(ApiResponse::ok(json!(issue_token(&claims)))));

        let session = h
            .store
            .login(LoginRequest::new("p@x.com", "p"))
            .await
            .expect("login");

        assert!(session.has_permission("users:delete"));
        assert!(!session.has_permission("campaigns:view"));
    }

    #[tokio::test]
    async fn login_without_credential_in_response() {
        let h = harness();
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse {
                success: true,
                data: None,
                message: None,
            }),
        );

        let err = h
            .store
            .login(LoginRequest::new("a@x.com", "p"))
            .await
            .expect_err("no token");

        assert_eq!(err, SessionError::NoCredentialReturned);
        let session = h.store.snapshot();
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert_eq!(session.error(), Some(err.to_string().as_str()));
        assert_invariant(&session);
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn login_rejects_pre_expired_credential() {
        let h = harness();
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::User, Duration::seconds(-5))))),
        );

        let err = h
            .store
            .login(LoginRequest::new("a@x.com", "p"))
            .await
            .expect_err("expired");

        assert_eq!(err, SessionError::Expired);
        assert_eq!(persisted(&h), None);
        assert!(!h.store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn login_rejected_by_server_surfaces_message() {
        let h = harness();
        h.api
            .respond(LOGIN_PATH, Ok(ApiResponse::failure("Invalid email or password")));

        let err = h
            .store
            .login(LoginRequest::new("a@x.com", "wrong"))
            .await
            .expect_err("rejected");

        assert_eq!(
            err,
            SessionError::Rejected {
                message: "Invalid email or password".to_string()
            }
        );
        assert_eq!(h.store.snapshot().error(), Some("Invalid email or password"));
    }

    #[tokio::test]
    async fn login_with_malformed_credential() {
        let h = harness();
        h.api.respond(LOGIN_PATH, Ok(ApiResponse::ok(json!("garbage"))));

        let err = h
            .store
            .login(LoginRequest::new("a@x.com", "p"))
            .await
            .expect_err("malformed");
        assert!(matches!(err, SessionError::InvalidCredential { .. }));
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn overlapping_login_is_refused() {
        let h = harness_with(
            MockApiClient::new().with_delay(std::time::Duration::from_millis(20)),
            MemoryCredentialStore::new(),
        );
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::Manager, Duration::hours(1))))),
        );

        let (first, second) = tokio::join!(
            h.store.login(LoginRequest::new("m@x.com", "p")),
            h.store.login(LoginRequest::new("m@x.com", "p")),
        );

        assert!(first.is_ok());
        assert_eq!(second.expect_err("busy"), SessionError::TransitionInProgress);
        assert_eq!(h.api.requests().len(), 1);
        assert!(h.store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn status_is_authenticating_while_login_in_flight() {
        let h = harness_with(
            MockApiClient::new().with_delay(std::time::Duration::from_millis(20)),
            MemoryCredentialStore::new(),
        );
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::User, Duration::hours(1))))),
        );

        let observe = async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            h.store.snapshot()
        };
        let (result, during) = tokio::join!(h.store.login(LoginRequest::new("u@x.com", "p")), observe);

        assert!(result.is_ok());
        assert_eq!(during.status(), SessionStatus::Authenticating);
        assert_invariant(&during);
    }

    #[tokio::test]
    async fn initialize_restores_valid_credential_without_network() {
        let issued = token(Role::Advertiser, Duration::hours(2));
        let h = harness_with(
            MockApiClient::new(),
            MemoryCredentialStore::with_credential(Credential::new(issued)),
        );

        let session = h.store.initialize().await.expect("initialize");

        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Advertiser));
        assert_eq!(
            session.permissions(),
            Some(&permission::permissions_for(Role::Advertiser))
        );
        assert!(h.api.requests().is_empty());
    }

    #[tokio::test]
    async fn initialize_discards_credential_inside_safety_window() {
        let issued = token(Role::Admin, Duration::seconds(200));
        let h = harness_with(
            MockApiClient::new(),
            MemoryCredentialStore::with_credential(Credential::new(issued)),
        );

        let err = h.store.initialize().await.expect_err("expiring");

        assert_eq!(err, SessionError::Expired);
        assert_eq!(h.store.snapshot().status(), SessionStatus::Unauthenticated);
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn initialize_with_unbounded_window_discards_credential() {
        let api = Arc::new(MockApiClient::new());
        let credentials = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
            token(Role::Admin, Duration::days(30)),
        )));
        let config = SessionConfig {
            expiry_window_seconds: i64::MAX,
            ..SessionConfig::default()
        };
        let store = SessionStore::new(api, credentials.clone(), config);

        assert_eq!(store.initialize().await, Err(SessionError::Expired));
        assert_eq!(credentials.load().expect("load"), None);
    }

    #[tokio::test]
    async fn initialize_without_credential() {
        let h = harness();
        let err = h.store.initialize().await.expect_err("nothing persisted");
        assert_eq!(err, SessionError::NoCredential);
        assert_eq!(h.store.snapshot(), Session::unauthenticated());
    }

    #[tokio::test]
    async fn initialize_discards_malformed_credential() {
        let h = harness_with(
            MockApiClient::new(),
            MemoryCredentialStore::with_credential(Credential::new("not-a-token")),
        );
        let err = h.store.initialize().await.expect_err("malformed");
        assert!(matches!(err, SessionError::InvalidCredential { .. }));
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn refresh_replaces_credential_and_keeps_subdomain() {
        let h = harness();
        let first = token(Role::Manager, Duration::minutes(10));
        h.api.respond(LOGIN_PATH, Ok(ApiResponse::ok(json!(first.clone()))));
        h.store
            .login(LoginRequest::new("m@x.com", "p").with_subdomain(Subdomain::new("acme")))
            .await
            .expect("login");

        let mut renewed = claims_for(Role::Manager, Utc::now() + Duration::hours(8));
        renewed.name = "Renamed".to_string();
        let second = issue_token(&renewed);
        h.api
            .respond(REFRESH_TOKEN_PATH, Ok(ApiResponse::ok(json!(second.clone()))));

        let session = h.store.refresh().await.expect("refresh");

        assert_eq!(session.user().map(|u| u.name.as_str()), Some("Renamed"));
        assert_eq!(session.subdomain(), Some(&Subdomain::new("acme")));
        assert_eq!(session.expires_at(), Some(renewed.expires_at));
        assert_eq!(persisted(&h), Some(Credential::new(second)));
        let refresh_request = h.api.requests().pop().expect("refresh request");
        assert_eq!(refresh_request.payload, Some(json!({"refreshToken": first})));
    }

    #[tokio::test]
    async fn refresh_network_failure_forces_logout() {
        let h = harness();
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::Admin, Duration::hours(1))))),
        );
        h.store
            .login(LoginRequest::new("a@x.com", "p"))
            .await
            .expect("login");
        h.api.respond(
            REFRESH_TOKEN_PATH,
            Err(ApiError::NetworkFailure {
                reason: "connection reset".to_string(),
            }),
        );

        let err = h.store.refresh().await.expect_err("network");

        assert!(matches!(err, SessionError::NetworkFailure { .. }));
        let session = h.store.snapshot();
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(session.user().is_none());
        assert!(session.permissions().is_none());
        assert!(session.subdomain().is_none());
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn refresh_without_credential_resets_session() {
        let h = harness();
        let err = h.store.refresh().await.expect_err("nothing to refresh");
        assert_eq!(err, SessionError::NoCredential);
        assert!(h.api.requests().is_empty());
        assert_eq!(h.store.snapshot().status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness();
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::User, Duration::hours(1))))),
        );
        h.store
            .login(LoginRequest::new("u@x.com", "p"))
            .await
            .expect("login");

        h.store.logout();
        let once = h.store.snapshot();
        h.store.logout();
        let twice = h.store.snapshot();

        assert_eq!(once, Session::unauthenticated());
        assert_eq!(once, twice);
        assert_eq!(persisted(&h), None);
    }

    #[tokio::test]
    async fn expire_if_needed_moves_to_expired() {
        let h = harness();
        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::User, Duration::hours(1))))),
        );
        let session = h
            .store
            .login(LoginRequest::new("u@x.com", "p"))
            .await
            .expect("login");
        let exp = session.expires_at().expect("expiry");

        assert!(!h.store.expire_if_needed(exp - Duration::seconds(1)));
        assert!(h.store.snapshot().is_authenticated());

        assert!(h.store.expire_if_needed(exp));
        let expired = h.store.snapshot();
        assert_eq!(expired.status(), SessionStatus::Expired);
        assert_invariant(&expired);
        assert_eq!(persisted(&h), None);
        assert!(!h.store.expire_if_needed(exp));
    }

    #[tokio::test]
    async fn update_profile_requires_authentication() {
        let h = harness();
        let err = h
            .store
            .update_profile(ProfileUpdate {
                name: Some("X".to_string()),
                email: None,
            })
            .expect_err("signed out");
        assert_eq!(err, SessionError::NotAuthenticated);

        h.api.respond(
            LOGIN_PATH,
            Ok(ApiResponse::ok(json!(token(Role::Manager, Duration::hours(1))))),
        );
        h.store
            .login(LoginRequest::new("m@x.com", "p"))
            .await
            .expect("login");

        let session = h
            .store
            .update_profile(ProfileUpdate {
                name: Some("New Name".to_string()),
                email: Some(" New@X.com".to_string()),
            })
            .expect("update");
        let user = session.user().expect("user");
        assert_eq!(user.name, "New Name");
        assert_eq!(user.email, "new@x.com");
        assert_eq!(user.role, Role::Manager);
    }

    #[tokio::test]
    async fn forgot_password_posts_normalized_email() {
        let h = harness();
        h.api.respond(
            FORGOT_PASSWORD_PATH,
            Ok(ApiResponse {
                success: true,
                data: None,
                message: Some("Reset email sent".to_string()),
            }),
        );

        let message = h
            .store
            .forgot_password(" Ada@X.com", Some(Subdomain::new("acme")))
            .await
            .expect("forgot");

        assert_eq!(message.as_deref(), Some("Reset email sent"));
        assert_eq!(
            h.api.requests()[0].payload,
            Some(json!({"email": "ada@x.com", "subdomain": "acme"}))
        );
        assert_eq!(h.store.snapshot(), Session::unauthenticated());
    }

    #[tokio::test]
    async fn reset_password_failure_is_recorded() {
        let h = harness();
        h.api
            .respond(RESET_PASSWORD_PATH, Ok(ApiResponse::failure("Token expired")));

        let err = h
            .store
            .reset_password("a@x.com", "tok", "n3w", None)
            .await
            .expect_err("rejected");

        assert_eq!(
            err,
            SessionError::Rejected {
                message: "Token expired".to_string()
            }
        );
        assert_eq!(h.store.snapshot().error(), Some("Token expired"));
        assert_eq!(
            h.api.requests()[0].payload,
            Some(json!({"email": "a@x.com", "token": "tok", "newPassword": "n3w"}))
        );
    }

    #[test]
    fn request_body_reports_unencodable_values() {
        let body = request_body(&LoginBody {
            email: "a@x.com",
            password: "p",
            subdomain: None,
        })
        .expect("encodable");
        assert_eq!(body["email"], "a@x.com");

        let tuple_keys: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into();
        assert!(matches!(
            request_body(&tuple_keys),
            Err(SessionError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn login_request_debug_hides_password() {
        let request = LoginRequest::new("a@x.com", "hunter2");
        assert!(!format!("{request:?}").contains("hunter2"));
    }

    #[test]
    fn session_constructors_uphold_invariant() {
        for session in [
            Session::unauthenticated(),
            Session::authenticating(None),
            Session::expired(),
            Session::authenticated(
                SessionUser {
                    id: UserId::new("u"),
                    name: String::new(),
                    email: String::new(),
                    role: Role::User,
                },
                PermissionSet::new(),
                None,
                Utc::now(),
            ),
        ] {
            assert_invariant(&session);
        }
    }
}
