//! HTTP transport for the affiliate console backend.
//!
//! [`HttpApiClient`] implements [`ApiClient`](affiliate_console_access::ApiClient)
//! over `reqwest`: it resolves paths against the configured API base URL,
//! attaches the persisted bearer credential and the tenant header, and turns
//! an HTTP 401 into a cleared credential plus a call to the unauthorized hook.

pub mod client;
pub mod config;
pub mod error;

pub use client::{HttpApiClient, SUBDOMAIN_HEADER, UnauthorizedHook};
pub use config::HttpClientConfig;
pub use error::HttpClientError;
