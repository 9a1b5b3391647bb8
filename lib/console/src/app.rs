//! The assembled console.

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::{logging, routes};
use affiliate_console_access::{
    AccessDecision, AccessGuard, FileCredentialStore, LoginRequest, Session, SessionError,
    SessionStore,
};
use affiliate_console_http::HttpApiClient;
use chrono::Utc;
use rootcause::prelude::{Report, ResultExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Session, transport, and guard wired together for one console instance.
pub struct Console {
    config: ConsoleConfig,
    api: Arc<HttpApiClient>,
    session: Arc<SessionStore>,
    guard: AccessGuard,
}

impl Console {
    /// Installs tracing with `config.log_filter`, builds the console, and
    /// restores the persisted session.
    ///
    /// A missing, expired, or malformed credential leaves the console
    /// signed out; the latter two are erased.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built or the credential
    /// store cannot be read.
    #[instrument(skip_all, fields(base_url = %config.api.base_url))]
    pub async fn bootstrap(config: ConsoleConfig) -> Result<Self, Report<ConsoleError>> {
        logging::init_tracing(&config.log_filter);

        let credentials = Arc::new(FileCredentialStore::new(&config.storage_path));
        let api = Arc::new(
            HttpApiClient::new(&config.api, credentials.clone()).context(ConsoleError::ApiClient)?,
        );
        let session = Arc::new(SessionStore::new(
            api.clone(),
            credentials,
            config.session.clone(),
        ));

        let weak_session = Arc::downgrade(&session);
        let weak_api = Arc::downgrade(&api);
        api.set_unauthorized_hook(Arc::new(move || {
            if let Some(session) = weak_session.upgrade() {
                session.logout();
            }
            if let Some(api) = weak_api.upgrade() {
                api.set_subdomain(None);
            }
        }));

        match session.initialize().await {
            Ok(restored) => {
                api.set_subdomain(restored.subdomain().cloned());
                info!("resumed previous session");
            }
            Err(
                e @ (SessionError::NoCredential
                | SessionError::Expired
                | SessionError::InvalidCredential { .. }),
            ) => {
                debug!(reason = %e, "starting signed out");
            }
            Err(e) => {
                return Err(ConsoleError::SessionRestore {
                    details: e.to_string(),
                }
                .into());
            }
        }

        let guard = AccessGuard::new(config.guard.clone());
        Ok(Self {
            config,
            api,
            session,
            guard,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &Arc<HttpApiClient> {
        &self.api
    }

    #[must_use]
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Signs in and scopes subsequent API calls to the session's tenant.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::login`].
    pub async fn login(&self, request: LoginRequest) -> Result<Session, SessionError> {
        let result = self.session.login(request).await;
        self.sync_subdomain();
        result
    }

    /// Renews the credential; a failure signs the console out.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::refresh`].
    pub async fn refresh(&self) -> Result<Session, SessionError> {
        let result = self.session.refresh().await;
        self.sync_subdomain();
        result
    }

    pub fn logout(&self) {
        self.session.logout();
        self.api.set_subdomain(None);
    }

    /// Decides whether the current session may open `path`.
    ///
    /// An authenticated session whose credential has run out is moved to
    /// `expired` first.
    #[must_use]
    pub fn authorize(&self, path: &str) -> AccessDecision {
        let Some(requirement) = routes::requirement_for(path) else {
            return AccessDecision::Allow;
        };
        self.session.expire_if_needed(Utc::now());
        self.guard
            .evaluate(&self.session.snapshot(), &requirement, path)
    }

    fn sync_subdomain(&self) {
        let session = self.session.snapshot();
        self.api.set_subdomain(session.subdomain().cloned());
    }
}
