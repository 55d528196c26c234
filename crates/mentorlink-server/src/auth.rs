//! Password hashing and access tokens
//!
//! Passwords are stored only as Argon2id hashes. Access tokens are
//! HS256 JWTs carrying the subject user id and role, validated
//! statelessly on every request.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mentorlink_core::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::state::SharedState;

/// Hash a password as Argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ServerError::Internal("Password hashing failed".to_string()))
}

/// Verify a password against its stored hash; comparison is
/// constant-time inside the argon2 crate
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Access token claims: subject user id and role only, no secrets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Token signing and verification keys derived from the service secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue an access token for a user
    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| ServerError::Internal("Token generation failed".to_string()))
    }

    /// Validate a token and extract its claims; expiry is checked
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| ServerError::InvalidCredentials)
    }
}

/// Authenticated caller, extracted from the Bearer token
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthUser {
    /// Gate a handler on an exact role
    pub fn require(self, role: Role) -> Result<Self> {
        if self.role == role {
            Ok(self)
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServerError::InvalidCredentials)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ServerError::InvalidCredentials)?;
        let claims = state.tokens.verify(token)?;
        let id = claims
            .sub
            .parse()
            .map_err(|_| ServerError::InvalidCredentials)?;
        Ok(AuthUser {
            id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2!").unwrap();
        assert_ne!(hash, "hunter2!");
        assert!(verify_password("hunter2!", &hash));
        assert!(!verify_password("hunter3!", &hash));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_roundtrip() {
        let keys = TokenKeys::new("test-secret", 1);
        let token = keys.issue(42, Role::Mentor).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Mentor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let keys = TokenKeys::new("secret-a", 1);
        let other = TokenKeys::new("secret-b", 1);
        let token = keys.issue(1, Role::Student).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_role_gate() {
        let user = AuthUser {
            id: 1,
            role: Role::Student,
        };
        assert!(user.require(Role::Student).is_ok());
        assert!(matches!(
            user.require(Role::Admin).unwrap_err(),
            ServerError::Forbidden
        ));
    }
}
