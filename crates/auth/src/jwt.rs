//! HS256 bearer-token validation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{Claims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    /// Signature or structural failure from the token library.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Structurally valid token whose claims fail time-window validation.
    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Validates a bearer token into [`Claims`].
///
/// Trait seam so the middleware can be tested with a stub and the signing
/// scheme can change without touching HTTP code.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError>;
}

/// HMAC-SHA256 validator over a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time-window checks run on our own claims; the library's `exp`
        // handling is bypassed because claims carry RFC3339 timestamps.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| JwtError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clinicore_core::ProviderId;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{PrincipalId, Role};

    fn mint(secret: &str, issued: DateTime<Utc>, expires: DateTime<Utc>) -> String {
        let claims = Claims {
            sub: PrincipalId::new(),
            provider_id: ProviderId::new(),
            roles: vec![Role::new("doctor")],
            issued_at: issued,
            expires_at: expires,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let now = Utc::now();
        let token = mint("s3cret", now, now + Duration::minutes(10));
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let claims = v.validate(&token, now).unwrap();
        assert_eq!(claims.roles, vec![Role::new("doctor")]);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let token = mint("s3cret", now, now + Duration::minutes(10));
        let v = Hs256JwtValidator::new(b"other".to_vec());
        assert!(matches!(v.validate(&token, now), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn expired_token_fails_claims_validation() {
        let now = Utc::now();
        let token = mint("s3cret", now - Duration::hours(2), now - Duration::hours(1));
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(matches!(
            v.validate(&token, now),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }
}
