//! Bearer token issuance and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;

use devtrack_core::UserId;

use crate::claims::{JwtClaims, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, expired, or unverifiable. Deliberately carries no detail.
    #[error("invalid token")]
    InvalidToken,

    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Opaque "principal id ↔ bearer token" oracle.
pub trait TokenCodec: Send + Sync {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, TokenError>;

    /// Verify a token and return its claims.
    ///
    /// Every failure collapses to `TokenError::InvalidToken`.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// HS256 (shared secret) JWT codec.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8], ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked against the caller's clock in `validate_claims`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        if self.ttl <= chrono::Duration::zero() {
            return Err(TokenError::Issue("token lifetime must be positive".into()));
        }
        let claims = JwtClaims::new(subject, now, self.ttl)
            .ok_or_else(|| TokenError::Issue("token lifetime out of range".into()))?;
        debug!(user_id = %subject, exp = claims.exp, "issuing token");
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|_| TokenError::InvalidToken)?;
        validate_claims(&data.claims, now).map_err(|_| TokenError::InvalidToken)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec(secret: &str) -> Hs256TokenCodec {
        Hs256TokenCodec::new(secret.as_bytes(), Duration::hours(24))
    }

    #[test]
    fn issued_token_validates_to_subject() {
        let codec = codec("test-secret");
        let user = UserId::new();
        let now = Utc::now();
        let token = codec.issue(user, now).unwrap();
        assert_eq!(codec.validate(&token, now).unwrap().sub, user);
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(
            codec("test-secret").validate("invalid.token.here", Utc::now()),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn different_secret_is_invalid() {
        let now = Utc::now();
        let token = codec("secret1").issue(UserId::new(), now).unwrap();
        assert_eq!(codec("secret2").validate(&token, now), Err(TokenError::InvalidToken));
    }

    #[test]
    fn expired_token_is_invalid() {
        let codec = Hs256TokenCodec::new(b"test-secret", Duration::minutes(1));
        let now = Utc::now();
        let token = codec.issue(UserId::new(), now).unwrap();
        assert_eq!(
            codec.validate(&token, now + Duration::minutes(2)),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn unusable_lifetimes_fail_to_issue() {
        let now = Utc::now();
        for ttl in [Duration::zero(), Duration::hours(-1), Duration::MAX] {
            let codec = Hs256TokenCodec::new(b"test-secret", ttl);
            assert!(matches!(codec.issue(UserId::new(), now), Err(TokenError::Issue(_))));
        }
    }
}
