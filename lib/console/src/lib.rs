//! Affiliate console runtime wiring.
//!
//! Composes the credential store, HTTP client, session store, and access
//! guard into a [`Console`], restores the previous session at bootstrap,
//! and maps console routes to their access requirements.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

pub use app::Console;
pub use config::ConsoleConfig;
pub use error::ConsoleError;
