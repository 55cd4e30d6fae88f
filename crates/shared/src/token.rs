//! Signed capability tokens.
//!
//! A token is an HS256 JWT wrapped in URL-safe base64 so it can travel as a
//! single URL path segment. Tokens signed without an expiry carry no
//! timestamp claims at all, which makes signing deterministic: identical
//! claims always produce byte-identical tokens. Variant key derivation
//! depends on that.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// The token's signature does not match its payload.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token is not structurally valid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token carries an expiry claim that has passed.
    #[error("token has expired")]
    Expired,
}

/// Claims signed into a capability URL.
///
/// Created at URL issuance, consumed once at verification, never persisted.
/// On an inbound request these claims are the sole authority for key,
/// disposition, and content type; matching query parameters are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityClaims {
    /// The blob or variant key this token authorizes access to.
    pub key: String,
    /// Full Content-Disposition header value.
    pub disposition: String,
    /// MIME type of the object.
    pub content_type: String,
    /// Unix expiry timestamp. Absent for non-expiring tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Signs and verifies capability tokens with a shared secret.
#[derive(Clone)]
pub struct Verifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl Verifier {
    /// Creates a verifier from a shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs `claims` and returns a URL-safe token.
    ///
    /// No issued-at claim is injected: a claims value without volatile
    /// fields signs to the same token on every call.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if serialization fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let jwt = encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(jwt))
    }

    /// Verifies a token and deserializes its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidSignature` if the signature check fails,
    /// `TokenError::Expired` if an expiry claim is present and has passed,
    /// and `TokenError::Malformed` for anything that is not a valid token.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let jwt = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| TokenError::Malformed(e.to_string()))
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| TokenError::Malformed(e.to_string()))
            })?;

        // Expiry is validated when present but never required; non-expiring
        // tokens carry no `exp` claim.
        let mut validation = Validation::default();
        validation.set_required_spec_claims::<&str>(&[]);

        decode::<T>(&jwt, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }

    /// Returns the unix timestamp `duration_secs` from now, for filling an
    /// `exp` claim.
    #[must_use]
    pub fn expiry_in(duration_secs: u64) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        now + duration_secs
    }
}
