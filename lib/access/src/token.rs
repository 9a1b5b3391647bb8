//! Bearer credential decoding.
//!
//! Credentials are JWTs in compact form (`header.payload.signature`, each
//! segment base64url). The backend verifies signatures; the console only
//! needs the claims, so decoding checks the header, structure and claim
//! presence and leaves the signature and expiry to the caller.

use crate::error::TokenError;
use crate::role::Role;
use affiliate_console_core::UserId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw credential string as issued by the backend.
///
/// The `Debug` impl is redacted so credentials never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token, e.g. for an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Claims carried by a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The user the credential was issued to.
    pub subject: UserId,
    /// Display name, empty if the issuer omitted it.
    pub name: String,
    /// Email address, empty if the issuer omitted it.
    pub email: String,
    pub role: Role,
    /// Explicit permission grant; `None` means "derive from the role".
    pub permissions: Option<Vec<String>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// JSON layout of the payload segment.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    #[serde(alias = "id", alias = "userId", default)]
    pub(crate) sub: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) iat: Option<i64>,
    #[serde(default)]
    pub(crate) exp: Option<i64>,
}

impl From<&Claims> for WireClaims {
    fn from(claims: &Claims) -> Self {
        Self {
            sub: Some(serde_json::Value::String(claims.subject.to_string())),
            name: Some(claims.name.clone()),
            email: Some(claims.email.clone()),
            role: Some(claims.role.as_str().to_string()),
            permissions: claims.permissions.clone(),
            iat: claims.issued_at.map(|t| t.timestamp()),
            exp: Some(claims.expires_at.timestamp()),
        }
    }
}

impl TryFrom<WireClaims> for Claims {
    type Error = TokenError;

    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let subject = match wire.sub {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => UserId::new(s),
            Some(serde_json::Value::Number(n)) => UserId::new(n.to_string()),
            _ => return Err(TokenError::invalid("missing subject claim")),
        };

        let role = wire
            .role
            .ok_or_else(|| TokenError::invalid("missing role claim"))?
            .parse::<Role>()
            .map_err(|e| TokenError::invalid(e.to_string()))?;

        let expires_at = wire
            .exp
            .ok_or_else(|| TokenError::invalid("missing exp claim"))
            .and_then(|secs| timestamp(secs, "exp"))?;
        let issued_at = wire.iat.map(|secs| timestamp(secs, "iat")).transpose()?;

        Ok(Self {
            subject,
            name: wire.name.unwrap_or_default(),
            email: wire.email.unwrap_or_default(),
            role,
            permissions: wire.permissions,
            issued_at,
            expires_at,
        })
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| TokenError::invalid(format!("{claim} claim out of range")))
}

/// Decodes the claims of a credential.
///
/// An expired credential decodes successfully; use [`is_expired`] to
/// classify it.
///
/// # Errors
///
/// Returns [`TokenError::InvalidCredential`] when the token is not three
/// dot-separated segments, the header is not a base64url JWS header, the
/// payload is not base64url JSON, or a required claim (`sub`, `role`,
/// `exp`) is missing or malformed.
pub fn decode(credential: &str) -> Result<Claims, TokenError> {
    let data = jsonwebtoken::decode::<WireClaims>(
        credential.trim(),
        &DecodingKey::from_secret(&[]),
        &claims_only(),
    )
    .map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::InvalidToken => "expected three dot-separated segments".to_string(),
            ErrorKind::Base64(_) => format!("segment is not base64url: {e}"),
            ErrorKind::Json(_) => format!("header or claims are not valid JSON: {e}"),
            _ => e.to_string(),
        };
        TokenError::invalid(reason)
    })?;

    Claims::try_from(data.claims)
}

/// Validation that reads claims without checking signature or expiry.
fn claims_only() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.insecure_disable_signature_validation();
    validation
}

/// Returns true once `now` has reached the expiry instant.
///
/// The boundary is inclusive: a token expiring exactly at `now` is expired.
#[must_use]
pub fn is_expired(claims: &Claims, now: DateTime<Utc>) -> bool {
    claims.expires_at <= now
}

/// Returns true if the token is expired or expires within `window` of `now`.
///
/// A window reaching past the representable time range covers every token.
#[must_use]
pub fn expires_within(claims: &Claims, now: DateTime<Utc>, window: Duration) -> bool {
    now.checked_add_signed(window)
        .is_none_or(|horizon| claims.expires_at <= horizon)
}

/// Signs claims with a fixed test key into a token [`decode`] reads.
#[cfg(any(test, feature = "testing"))]
pub(crate) fn encode_for_tests(claims: &Claims) -> String {
    use jsonwebtoken::{EncodingKey, Header};

    // WireClaims only holds strings, numbers, and options of those.
    jsonwebtoken::encode(
        &Header::default(),
        &WireClaims::from(claims),
        &EncodingKey::from_secret(b"affiliate-console-test-key"),
    )
    .unwrap_or_default()
}
