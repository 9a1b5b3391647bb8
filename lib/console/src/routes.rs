//! Console routes and the access each one requires.

use affiliate_console_access::AccessRequirement;
use affiliate_console_access::permission::{
    ADVERTISERS_VIEW, CAMPAIGNS_CREATE, CAMPAIGNS_EDIT, CAMPAIGNS_VIEW, COMPANIES_VIEW,
    DASHBOARD_VIEW, PUBLISHERS_VIEW, REPORTS_VIEW, SETTINGS_VIEW, USERS_VIEW,
};

/// Routes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/forgot-password", "/reset-password"];

/// Returns the requirement guarding `path`, or `None` for public routes.
///
/// Query strings and fragments are ignored. Paths the console does not
/// know require authentication only.
#[must_use]
pub fn requirement_for(path: &str) -> Option<AccessRequirement> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    if PUBLIC_ROUTES.contains(&path) {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let requirement = AccessRequirement::authenticated();
    Some(match segments.as_slice() {
        ["dashboard", ..] => requirement.permission(DASHBOARD_VIEW),
        ["companies", ..] => requirement.permission(COMPANIES_VIEW),
        ["campaigns", "new"] => requirement.permission(CAMPAIGNS_CREATE),
        ["campaigns", _, "edit"] => requirement.permission(CAMPAIGNS_EDIT),
        ["campaigns", ..] => requirement.permission(CAMPAIGNS_VIEW),
        ["publishers", ..] => requirement.permission(PUBLISHERS_VIEW),
        ["advertisers", ..] => requirement.permission(ADVERTISERS_VIEW),
        ["users", ..] => requirement.permission(USERS_VIEW),
        ["reports", ..] => requirement.permission(REPORTS_VIEW),
        ["settings", ..] => requirement.permission(SETTINGS_VIEW),
        _ => requirement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_permission(path: &str) -> Option<String> {
        requirement_for(path).and_then(|r| r.required_permission)
    }

    #[test]
    fn public_routes_are_unguarded() {
        assert!(requirement_for("/login").is_none());
        assert!(requirement_for("/login?redirect=%2Fusers").is_none());
        assert!(requirement_for("/reset-password/").is_none());
    }

    #[test]
    fn campaign_routes() {
        assert_eq!(required_permission("/campaigns").as_deref(), Some(CAMPAIGNS_VIEW));
        assert_eq!(required_permission("/campaigns/new").as_deref(), Some(CAMPAIGNS_CREATE));
        assert_eq!(required_permission("/campaigns/42/edit").as_deref(), Some(CAMPAIGNS_EDIT));
        assert_eq!(required_permission("/campaigns/42").as_deref(), Some(CAMPAIGNS_VIEW));
    }

    #[test]
    fn section_routes_map_to_view_permissions() {
        assert_eq!(required_permission("/users?page=2").as_deref(), Some(USERS_VIEW));
        assert_eq!(required_permission("/reports/").as_deref(), Some(REPORTS_VIEW));
        assert_eq!(required_permission("/settings").as_deref(), Some(SETTINGS_VIEW));
    }

    #[test]
    fn unknown_routes_require_authentication_only() {
        assert_eq!(requirement_for("/profile"), Some(AccessRequirement::authenticated()));
        assert_eq!(requirement_for("/"), Some(AccessRequirement::authenticated()));
    }
}
