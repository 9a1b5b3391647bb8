//! Console roles.
//!
//! Every console user holds exactly one role. The role selects the default
//! permission set from the [`permission`](crate::permission) catalog when
//! the credential does not carry explicit permissions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role assigned to a console user.
///
/// Roles serialize in kebab-case (`"super-admin"`), matching the `role`
/// claim issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Unrestricted operator of the whole platform.
    SuperAdmin,
    /// Administrator of a tenant.
    Admin,
    /// Account manager running campaigns for a tenant.
    Manager,
    /// Traffic source promoting campaigns.
    Publisher,
    /// Brand paying for conversions.
    Advertiser,
    /// Read-mostly tenant member.
    User,
}

impl Role {
    /// All roles, most privileged first.
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Manager,
        Role::Publisher,
        Role::Advertiser,
        Role::User,
    ];

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Publisher => "publisher",
            Self::Advertiser => "advertiser",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not part of the enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
