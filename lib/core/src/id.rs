//! Strongly-typed identifiers for console entities.
//!
//! Identifiers are issued by the backend API, so they wrap the server's
//! string form rather than generating values locally. Every constructor,
//! deserialization included, applies the type's normalization; `FromStr`
//! additionally trims surrounding whitespace and rejects empty input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around a server-issued string.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, normalize = $normalize:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a normalized ID from a raw string without validation.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                let normalize: fn(&str) -> String = $normalize;
                Self(normalize(&id.into()))
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the ID and returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "value is empty".to_string(),
                    });
                }
                Ok(Self::new(trimmed))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::new)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a console user, taken from the credential's subject.
    UserId,
    normalize = |s| s.to_string()
);

define_id!(
    /// Tenant identifier scoping every API call after login.
    ///
    /// Subdomains are host labels, so they compare case-insensitively and are
    /// stored lowercased.
    Subdomain,
    normalize = |s| s.to_ascii_lowercase()
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_display_is_raw_value() {
        let id = UserId::new("64f1c0ffee");
        assert_eq!(id.to_string(), "64f1c0ffee");
        assert_eq!(id.as_str(), "64f1c0ffee");
    }

    #[test]
    fn user_id_parse_trims() {
        let id: UserId = "  42 ".parse().expect("parse");
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn parse_rejects_empty() {
        let err = "   ".parse::<UserId>().expect_err("empty must fail");
        assert_eq!(err.id_type, "UserId");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn subdomain_parse_lowercases() {
        let sub: Subdomain = "Acme".parse().expect("parse");
        assert_eq!(sub.as_str(), "acme");
    }

    #[test]
    fn subdomain_is_normalized_by_every_constructor() {
        assert_eq!(Subdomain::new("Acme").as_str(), "acme");
        assert_eq!(Subdomain::new("acme"), Subdomain::new("ACME"));

        let parsed: Subdomain = serde_json::from_str("\"Acme\"").expect("deserialize");
        assert_eq!(parsed.as_str(), "acme");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&Subdomain::new("acme")).expect("serialize");
        assert_eq!(json, "\"acme\"");
        let parsed: UserId = serde_json::from_str("\"u-1\"").expect("deserialize");
        assert_eq!(parsed, UserId::new("u-1"));
    }
}
