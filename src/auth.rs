use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::models::UserRole;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Expected a {expected} token")]
    WrongTokenKind { expected: TokenKind },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn issue(
    user_id: Uuid,
    role: UserRole,
    kind: TokenKind,
    ttl: Duration,
    secret: &str,
) -> Result<String, AuthError> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        role,
        kind,
        iat: now.unix_timestamp(),
        exp: (now + ttl).unix_timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

pub fn issue_token_pair(
    user_id: Uuid,
    role: UserRole,
    config: &AuthConfig,
) -> Result<TokenPair, AuthError> {
    Ok(TokenPair {
        access: issue(
            user_id,
            role,
            TokenKind::Access,
            Duration::minutes(config.access_token_ttl_minutes),
            &config.jwt_secret,
        )?,
        refresh: issue(
            user_id,
            role,
            TokenKind::Refresh,
            Duration::days(config.refresh_token_ttl_days),
            &config.jwt_secret,
        )?,
    })
}

pub fn issue_access_token(
    user_id: Uuid,
    role: UserRole,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    issue(
        user_id,
        role,
        TokenKind::Access,
        Duration::minutes(config.access_token_ttl_minutes),
        &config.jwt_secret,
    )
}

/// Decodes and validates a token, rejecting tokens of the wrong kind so a
/// refresh token can never be used as an access token (or vice versa).
pub fn verify_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    if data.claims.kind != expected {
        return Err(AuthError::WrongTokenKind { expected });
    }
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 7,
        }
    }

    #[test]
    fn token_pair_round_trip() {
        let config = config();
        let user_id = Uuid::new_v4();
        let pair = issue_token_pair(user_id, UserRole::Student, &config).unwrap();

        let access = verify_token(&pair.access, &config.jwt_secret, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user_id);
        assert_eq!(access.role, UserRole::Student);

        let refresh = verify_token(&pair.refresh, &config.jwt_secret, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.sub, user_id);
    }

    #[test]
    fn refresh_token_is_rejected_as_access_token() {
        let config = config();
        let pair = issue_token_pair(Uuid::new_v4(), UserRole::Student, &config).unwrap();
        let err = verify_token(&pair.refresh, &config.jwt_secret, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenKind { .. }));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = config();
        let pair = issue_token_pair(Uuid::new_v4(), UserRole::Student, &config).unwrap();
        let mut tampered = pair.access.clone();
        tampered.push('x');
        assert!(verify_token(&tampered, &config.jwt_secret, TokenKind::Access).is_err());
        assert!(verify_token(&pair.access, "other-secret", TokenKind::Access).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        verify_password("hunter2", &hash).unwrap();
        let err = verify_password("wrong", &hash).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
