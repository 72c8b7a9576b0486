//! Token issuing and validation
//!
//! Access tokens are signed JWTs verified by signature and expiry alone.
//! Refresh tokens are opaque random strings; only their SHA-256 digest is
//! stored, so validating one always takes a store round-trip.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthContext, TokenPair, User, UserRole};

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub role: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Converts verified claims into the caller identity used by the core
    pub fn into_context(self) -> Result<AuthContext, JwtError> {
        let user_id = self
            .sub
            .parse::<i64>()
            .map_err(|e| JwtError::InvalidToken(format!("bad subject: {}", e)))?;
        let role = UserRole::from_claim(&self.role)
            .ok_or_else(|| JwtError::InvalidToken(format!("unknown role '{}'", self.role)))?;

        Ok(AuthContext {
            user_id,
            username: self.username,
            role,
        })
    }
}

/// Freshly minted credentials plus what the caller must persist
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub pair: TokenPair,
    pub refresh_token_hash: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Stateless token generator
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl TokenIssuer {
    pub fn new(secret: String, access_token_ttl_seconds: i64, refresh_token_ttl_days: i64) -> Self {
        Self {
            secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    /// Issue an access token and a refresh token for `user`
    ///
    /// Nothing is persisted here; the session service stores the refresh
    /// token digest.
    pub fn issue(&self, user: &User) -> Result<IssuedTokens, JwtError> {
        let now = Utc::now();
        let access_token = self.access_token(user, now)?;
        let refresh_token = generate_refresh_token();

        Ok(IssuedTokens {
            refresh_token_hash: hash_refresh_token(&refresh_token),
            refresh_expires_at: now + Duration::days(self.refresh_token_ttl_days),
            pair: TokenPair {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.access_token_ttl_seconds,
            },
        })
    }

    fn access_token(&self, user: &User, now: DateTime<Utc>) -> Result<String, JwtError> {
        let exp = now + Duration::seconds(self.access_token_ttl_seconds);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify and decode an access token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::DecodingFailed(e.to_string()),
        })?;

        Ok(token_data.claims)
    }
}

/// Digest stored in place of the raw refresh token
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BankProfile;

    fn create_test_user(role: UserRole) -> User {
        User {
            id: 42,
            username: "teller01".to_string(),
            password_hash: String::new(),
            role,
            is_approved: true,
            profile: BankProfile::default(),
            created_at: Utc::now(),
            approved_at: None,
            rejection_reason: None,
        }
    }

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(secret.to_string(), 7200, 7)
    }

    #[test]
    fn test_issue_token_pair() {
        let issued = issuer("test-secret-key")
            .issue(&create_test_user(UserRole::Bank))
            .unwrap();

        assert_eq!(issued.pair.token_type, "Bearer");
        assert_eq!(issued.pair.expires_in, 7200);
        assert_ne!(issued.pair.access_token, issued.pair.refresh_token);
        assert_eq!(
            issued.refresh_token_hash,
            hash_refresh_token(&issued.pair.refresh_token)
        );
        assert!(issued.refresh_expires_at > Utc::now() + Duration::days(6));
    }

    #[test]
    fn test_access_token_claims() {
        let issuer = issuer("test-secret-key");
        let issued = issuer.issue(&create_test_user(UserRole::Admin)).unwrap();

        let claims = issuer.verify_access_token(&issued.pair.access_token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "teller01");
        assert_eq!(claims.role, "admin");

        let context = claims.into_context().unwrap();
        assert_eq!(context.user_id, 42);
        assert_eq!(context.role, UserRole::Admin);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let issuer = issuer("test-secret-key");
        let user = create_test_user(UserRole::Public);
        let first = issuer.issue(&user).unwrap();
        let second = issuer.issue(&user).unwrap();
        assert_ne!(first.pair.refresh_token, second.pair.refresh_token);
    }

    #[test]
    fn test_refresh_token_is_not_a_jwt() {
        let issued = issuer("test-secret-key")
            .issue(&create_test_user(UserRole::Public))
            .unwrap();
        assert!(issuer("test-secret-key")
            .verify_access_token(&issued.pair.refresh_token)
            .is_err());
    }

    #[test]
    fn test_invalid_token() {
        let result = issuer("test-secret-key").verify_access_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let issued = issuer("secret1")
            .issue(&create_test_user(UserRole::Bank))
            .unwrap();
        let result = issuer("secret2").verify_access_token(&issued.pair.access_token);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token() {
        let expired = TokenIssuer::new("test-secret-key".to_string(), -120, 7);
        let issued = expired.issue(&create_test_user(UserRole::Bank)).unwrap();
        let result = expired.verify_access_token(&issued.pair.access_token);
        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }
}
