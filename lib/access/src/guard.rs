//! Route protection.
//!
//! The guard decides whether a session may see a protected view. Checks
//! short-circuit in order: authentication, role, single permission, any of
//! a permission list. A signed-out visitor is sent to the login route with
//! the requested location attached; an authorization denial goes to the
//! landing route, or renders the caller's fallback when one is supplied.

use crate::config::GuardConfig;
use crate::role::Role;
use crate::session::Session;
use tracing::debug;

/// What a protected view demands of the session.
///
/// All set conditions must hold. `required_permissions` is satisfied by
/// any one of its members; an empty list imposes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirement {
    pub required_permission: Option<String>,
    pub required_permissions: Vec<String>,
    pub required_role: Option<Role>,
}

impl AccessRequirement {
    /// Authentication only.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    #[must_use]
    pub fn any_of<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }
}

/// Why a redirect was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// The session is not authenticated.
    Login,
    /// The session lacks the required role or permission.
    Landing,
}

/// A navigation the guard asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
    /// Location to come back to after signing in.
    pub return_to: Option<String>,
    return_param: String,
}

impl Redirect {
    /// Renders the redirect as a URL path, with `return_to` percent-encoded
    /// into the configured query parameter.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.return_to {
            Some(return_to) => {
                let separator = if self.target.contains('?') { '&' } else { '?' };
                let param: String =
                    url::form_urlencoded::byte_serialize(self.return_param.as_bytes()).collect();
                let value: String =
                    url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
                format!("{}{separator}{param}={value}", self.target)
            }
            None => self.target.clone(),
        }
    }
}

/// Outcome of [`AccessGuard::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    DenyRedirect(Redirect),
}

impl AccessDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Outcome of [`AccessGuard::guard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<V> {
    Render(V),
    Redirect(Redirect),
}

/// Evaluates access requirements against a session snapshot.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    config: GuardConfig,
}

impl AccessGuard {
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decides whether `session` may see the view at `requested`.
    #[must_use]
    pub fn evaluate(
        &self,
        session: &Session,
        requirement: &AccessRequirement,
        requested: &str,
    ) -> AccessDecision {
        if !session.is_authenticated() {
            debug!(requested, "not authenticated, redirecting to login");
            return AccessDecision::DenyRedirect(self.redirect(
                RedirectKind::Login,
                Some(requested.to_string()),
            ));
        }

        if let Some(role) = requirement.required_role
            && session.role() != Some(role)
        {
            debug!(requested, required_role = %role, "role mismatch");
            return self.deny();
        }

        if let Some(permission) = &requirement.required_permission
            && !session.has_permission(permission)
        {
            debug!(requested, permission = %permission, "missing permission");
            return self.deny();
        }

        if !requirement.required_permissions.is_empty()
            && !session.has_any_permission(requirement.required_permissions.as_slice())
        {
            debug!(
                requested,
                permissions = ?requirement.required_permissions,
                "none of the permissions held"
            );
            return self.deny();
        }

        AccessDecision::Allow
    }

    /// Evaluates and applies the fallback policy.
    ///
    /// Login redirects always redirect. Authorization denials render
    /// `fallback` when given and redirect to the landing route otherwise.
    pub fn guard<V>(
        &self,
        session: &Session,
        requirement: &AccessRequirement,
        requested: &str,
        content: V,
        fallback: Option<V>,
    ) -> Guarded<V> {
        match self.evaluate(session, requirement, requested) {
            AccessDecision::Allow => Guarded::Render(content),
            AccessDecision::DenyRedirect(redirect) => match (redirect.kind, fallback) {
                (RedirectKind::Landing, Some(fallback)) => Guarded::Render(fallback),
                _ => Guarded::Redirect(redirect),
            },
        }
    }

    fn deny(&self) -> AccessDecision {
        AccessDecision::DenyRedirect(self.redirect(RedirectKind::Landing, None))
    }

    fn redirect(&self, kind: RedirectKind, return_to: Option<String>) -> Redirect {
        let target = match kind {
            RedirectKind::Login => &self.config.login_route,
            RedirectKind::Landing => &self.config.landing_route,
        };
        Redirect {
            kind,
            target: target.clone(),
            return_to,
            return_param: self.config.return_param.clone(),
        }
    }
}
