//! Bearer tokens.
//!
//! A token is `base64url(claims JSON) "." hex(HMAC-SHA256(secret, payload))` where `payload` is
//! the base64url part. Signatures are compared in constant time by [`Mac::verify_slice`].
//!
//! Tokens carry the identity id, role and approval flag at issue time; handlers still reload the
//! identity on every request so deletions and approval changes take effect immediately.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use medibook_core::constants::DEFAULT_TOKEN_TTL_HOURS;
use medibook_core::Identity;
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("AUTH_SECRET is not set")]
    MissingSecret,
    #[error("invalid token lifetime: {0}")]
    InvalidTtl(String),
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("signing key rejected")]
    InvalidKey,
    #[error("token expired")]
    Expired,
    #[error("failed to encode claims: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id in canonical form.
    pub sub: String,
    pub role: String,
    pub approved: bool,
    /// Expiry as a Unix timestamp in seconds.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Builds the service from raw `AUTH_SECRET` and `TOKEN_TTL_HOURS` values.
    ///
    /// # Errors
    ///
    /// - [`TokenError::MissingSecret`] if the secret is absent or blank
    /// - [`TokenError::InvalidTtl`] if the lifetime is not a positive whole number of hours
    pub fn from_env_values(
        secret: Option<String>,
        ttl_hours: Option<String>,
    ) -> Result<Self, TokenError> {
        let secret = secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingSecret)?;

        let hours = match ttl_hours.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TOKEN_TTL_HOURS,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| TokenError::InvalidTtl(raw.to_string()))?,
        };

        Ok(Self::new(secret, Duration::hours(hours)))
    }

    fn mac(&self, payload: &str) -> Result<Hmac<Sha256>, TokenError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Issues a token for `identity` valid from `now` for the configured lifetime.
    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.id.to_string(),
            role: identity.role.as_str().to_string(),
            approved: identity.approved,
            exp: (now + self.ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Checks the signature and expiry of `token`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;

        let signature = hex::decode(signature).map_err(|_| TokenError::BadSignature)?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
