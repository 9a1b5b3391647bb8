//! Permission strings and the static role catalog.
//!
//! Permissions have the form `<resource>:<action>`. The catalog maps every
//! [`Role`] to its default permissions; `super-admin` holds all of them.
//! Everything here is pure lookup with no failure modes.
//!
//! # Example
//!
//! ```
//! use affiliate_console_access::permission::{self, has_any_permission};
//! use affiliate_console_access::Role;
//!
//! let granted = permission::permissions_for(Role::Publisher);
//! assert!(granted.contains(permission::CAMPAIGNS_VIEW));
//! assert!(!has_any_permission(&granted, &[permission::USERS_DELETE]));
//! ```

use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Dashboard
// =============================================================================

/// View the landing dashboard.
pub const DASHBOARD_VIEW: &str = "dashboard:view";

// =============================================================================
// Companies (tenants)
// =============================================================================

pub const COMPANIES_VIEW: &str = "companies:view";
pub const COMPANIES_CREATE: &str = "companies:create";
pub const COMPANIES_EDIT: &str = "companies:edit";
pub const COMPANIES_DELETE: &str = "companies:delete";

// =============================================================================
// Campaigns
// =============================================================================

pub const CAMPAIGNS_VIEW: &str = "campaigns:view";
pub const CAMPAIGNS_CREATE: &str = "campaigns:create";
pub const CAMPAIGNS_EDIT: &str = "campaigns:edit";
pub const CAMPAIGNS_DELETE: &str = "campaigns:delete";

// =============================================================================
// Publishers
// =============================================================================

pub const PUBLISHERS_VIEW: &str = "publishers:view";
pub const PUBLISHERS_CREATE: &str = "publishers:create";
pub const PUBLISHERS_EDIT: &str = "publishers:edit";
pub const PUBLISHERS_DELETE: &str = "publishers:delete";

// =============================================================================
// Advertisers
// =============================================================================

pub const ADVERTISERS_VIEW: &str = "advertisers:view";
pub const ADVERTISERS_CREATE: &str = "advertisers:create";
pub const ADVERTISERS_EDIT: &str = "advertisers:edit";
pub const ADVERTISERS_DELETE: &str = "advertisers:delete";

// =============================================================================
// Users
// =============================================================================

pub const USERS_VIEW: &str = "users:view";
pub const USERS_CREATE: &str = "users:create";
pub const USERS_EDIT: &str = "users:edit";
pub const USERS_DELETE: &str = "users:delete";

// =============================================================================
// Reports and settings
// =============================================================================

/// View conversion reports.
pub const REPORTS_VIEW: &str = "reports:view";
/// Export conversion reports as CSV.
pub const REPORTS_EXPORT: &str = "reports:export";
pub const SETTINGS_VIEW: &str = "settings:view";
pub const SETTINGS_EDIT: &str = "settings:edit";

/// Every permission the console defines, in catalog order.
pub const ALL: &[&str] = &[
    DASHBOARD_VIEW,
    COMPANIES_VIEW,
    COMPANIES_CREATE,
    COMPANIES_EDIT,
    COMPANIES_DELETE,
    CAMPAIGNS_VIEW,
    CAMPAIGNS_CREATE,
    CAMPAIGNS_EDIT,
    CAMPAIGNS_DELETE,
    PUBLISHERS_VIEW,
    PUBLISHERS_CREATE,
    PUBLISHERS_EDIT,
    PUBLISHERS_DELETE,
    ADVERTISERS_VIEW,
    ADVERTISERS_CREATE,
    ADVERTISERS_EDIT,
    ADVERTISERS_DELETE,
    USERS_VIEW,
    USERS_CREATE,
    USERS_EDIT,
    USERS_DELETE,
    REPORTS_VIEW,
    REPORTS_EXPORT,
    SETTINGS_VIEW,
    SETTINGS_EDIT,
];

// Creating and deleting tenants is reserved to super-admins.
const ADMIN: &[&str] = &[
    DASHBOARD_VIEW,
    COMPANIES_VIEW,
    COMPANIES_EDIT,
    CAMPAIGNS_VIEW,
    CAMPAIGNS_CREATE,
    CAMPAIGNS_EDIT,
    CAMPAIGNS_DELETE,
    PUBLISHERS_VIEW,
    PUBLISHERS_CREATE,
    PUBLISHERS_EDIT,
    PUBLISHERS_DELETE,
    ADVERTISERS_VIEW,
    ADVERTISERS_CREATE,
    ADVERTISERS_EDIT,
    ADVERTISERS_DELETE,
    USERS_VIEW,
    USERS_CREATE,
    USERS_EDIT,
    USERS_DELETE,
    REPORTS_VIEW,
    REPORTS_EXPORT,
    SETTINGS_VIEW,
    SETTINGS_EDIT,
];

const MANAGER: &[&str] = &[
    DASHBOARD_VIEW,
    COMPANIES_VIEW,
    CAMPAIGNS_VIEW,
    CAMPAIGNS_CREATE,
    CAMPAIGNS_EDIT,
    PUBLISHERS_VIEW,
    PUBLISHERS_CREATE,
    PUBLISHERS_EDIT,
    ADVERTISERS_VIEW,
    ADVERTISERS_CREATE,
    ADVERTISERS_EDIT,
    USERS_VIEW,
    REPORTS_VIEW,
    REPORTS_EXPORT,
];

const PUBLISHER: &[&str] = &[DASHBOARD_VIEW, CAMPAIGNS_VIEW, REPORTS_VIEW];

const ADVERTISER: &[&str] = &[
    DASHBOARD_VIEW,
    CAMPAIGNS_VIEW,
    CAMPAIGNS_CREATE,
    CAMPAIGNS_EDIT,
    REPORTS_VIEW,
    REPORTS_EXPORT,
];

const USER: &[&str] = &[DASHBOARD_VIEW, REPORTS_VIEW];

/// Returns the catalog entry for a role, in catalog order.
#[must_use]
pub fn catalog(role: Role) -> &'static [&'static str] {
    match role {
        Role::SuperAdmin => ALL,
        Role::Admin => ADMIN,
        Role::Manager => MANAGER,
        Role::Publisher => PUBLISHER,
        Role::Advertiser => ADVERTISER,
        Role::User => USER,
    }
}

/// Set of permission strings held by a session.
///
/// Order is irrelevant; the set may contain strings outside [`ALL`] when
/// the server grants them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the set contains `permission`.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Returns true if every permission of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the permissions in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Returns the full enumeration of defined permissions.
#[must_use]
pub fn all_permissions() -> PermissionSet {
    ALL.iter().copied().collect()
}

/// Returns the default permissions of a role.
#[must_use]
pub fn permissions_for(role: Role) -> PermissionSet {
    catalog(role).iter().copied().collect()
}

/// Returns the default permissions of a role given by wire name.
///
/// Unknown role names yield an empty set.
#[must_use]
pub fn permissions_for_role(role: &str) -> PermissionSet {
    role.parse::<Role>()
        .map(permissions_for)
        .unwrap_or_default()
}

/// Derives the permission set of a freshly decoded credential.
///
/// Server-supplied permissions win over the catalog, even when empty.
#[must_use]
pub fn derive_permissions(role: Role, server_supplied: Option<&[String]>) -> PermissionSet {
    match server_supplied {
        Some(granted) => granted.iter().cloned().collect(),
        None => permissions_for(role),
    }
}

/// Returns true if `set` holds `permission`.
#[must_use]
pub fn has_permission(set: &PermissionSet, permission: &str) -> bool {
    set.contains(permission)
}

/// Returns true if `set` holds at least one of `required`.
///
/// An empty requirement list places no requirement and returns true.
#[must_use]
pub fn has_any_permission<S: AsRef<str>>(set: &PermissionSet, required: &[S]) -> bool {
    required.is_empty() || required.iter().any(|p| set.contains(p.as_ref()))
}

/// Returns true if `set` holds every permission in `required`.
#[must_use]
pub fn has_all_permissions<S: AsRef<str>>(set: &PermissionSet, required: &[S]) -> bool {
    required.iter().all(|p| set.contains(p.as_ref()))
}
