//! Core types and utilities for the affiliate console.
//!
//! This crate provides the identifier types and the `Result` alias shared by
//! the session, HTTP, and console crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, Subdomain, UserId};
