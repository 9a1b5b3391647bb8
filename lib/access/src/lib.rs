//! Session and access control for the affiliate console.
//!
//! This crate provides:
//! - Credential decoding (`token`), never verifying signatures
//! - The role/permission catalog (`role`, `permission`)
//! - The session store driving login, bootstrap, refresh, and logout
//!   (`session`)
//! - Route protection (`guard`)
//! - The API collaborator interface (`api`) and credential persistence
//!   (`storage`)
//!
//! # Access Control Model
//!
//! Every user holds one role. A credential may carry an explicit
//! permission list; otherwise the role's catalog entry applies. Views
//! declare an [`AccessRequirement`] and the [`AccessGuard`] decides whether
//! the current [`Session`] may see them.
//!
//! # Example
//!
//! ```
//! use affiliate_console_access::{
//!     AccessDecision, AccessGuard, AccessRequirement, Role, Session, SessionUser, permission,
//! };
//! use affiliate_console_core::UserId;
//! use chrono::{Duration, Utc};
//!
//! let session = Session::authenticated(
//!     SessionUser {
//!         id: UserId::new("42"),
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!         role: Role::Publisher,
//!     },
//!     permission::permissions_for(Role::Publisher),
//!     None,
//!     Utc::now() + Duration::hours(1),
//! );
//!
//! let guard = AccessGuard::default();
//! let users = AccessRequirement::authenticated().permission(permission::USERS_VIEW);
//! assert!(matches!(
//!     guard.evaluate(&session, &users, "/users"),
//!     AccessDecision::DenyRedirect(_)
//! ));
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod permission;
pub mod role;
pub mod session;
pub mod storage;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types at crate root
pub use api::{ApiClient, ApiResponse};
pub use config::{GuardConfig, SessionConfig};
pub use error::{ApiError, SessionError, StorageError, TokenError};
pub use guard::{AccessDecision, AccessGuard, AccessRequirement, Guarded, Redirect, RedirectKind};
pub use permission::PermissionSet;
pub use role::{Role, UnknownRole};
pub use session::{
    LoginRequest, ProfileUpdate, Session, SessionStatus, SessionStore, SessionUser,
};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use token::{Claims, Credential};
