//! JWT token issuing and verification
//!
//! Access and refresh tokens are HS256-signed with two distinct secrets, so a
//! refresh token never passes access verification and vice versa. The subject
//! claim carries the user's email.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use saywrite_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user email
    #[serde(default)]
    pub sub: String,
    /// JWT ID, unique per issued token
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

/// JWT token issuing and verification errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has no subject")]
    MissingSubject,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Signing secrets and lifetimes for both token kinds
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from_auth_config(&AuthConfig::default())
    }
}

impl JwtConfig {
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.secret_key.clone(),
            refresh_secret: config.refresh_secret_key.clone(),
            access_ttl: Duration::from_secs(config.access_token_expire_minutes.saturating_mul(60)),
            refresh_ttl: Duration::from_secs(
                config.refresh_token_expire_days.saturating_mul(24 * 60 * 60),
            ),
            issuer: config.issuer.clone(),
        }
    }

    /// Access token lifetime in seconds, as reported in `expires_in`
    pub fn access_expires_in(&self) -> u64 {
        self.access_ttl.as_secs()
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn issue(issuer: &str, secret: &str, subject: &str, ttl: Duration) -> Result<String, JwtError> {
    let now = now_secs()?;

    let claims = Claims {
        iss: issuer.to_string(),
        sub: subject.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now.saturating_add(ttl.as_secs()),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Issue an access token for `subject`, signed with the access secret
pub fn issue_access(config: &JwtConfig, subject: &str, ttl: Duration) -> Result<String, JwtError> {
    issue(&config.issuer, &config.access_secret, subject, ttl)
}

/// Issue a refresh token for `subject`, signed with the refresh secret
pub fn issue_refresh(
    config: &JwtConfig,
    subject: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    issue(&config.issuer, &config.refresh_secret, subject, ttl)
}

/// Verify a token against `secret` and return its claims
///
/// There is no leeway: a token whose `exp` is not strictly in the future is
/// expired, so a zero lifetime never verifies. An empty subject is rejected.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    let claims = token_data.claims;
    if claims.exp <= now_secs()? {
        return Err(JwtError::ExpiredToken);
    }
    if claims.sub.trim().is_empty() {
        return Err(JwtError::MissingSubject);
    }

    Ok(claims)
}

/// Verify an access token
pub fn verify_access(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    verify_token(token, &config.access_secret)
}

/// Verify a refresh token
pub fn verify_refresh(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    verify_token(token, &config.refresh_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let config = config();
        let token = issue_access(&config, "alice@example.com", config.access_ttl)
            .expect("Failed to issue token");

        let claims = verify_access(&config, &token).expect("Failed to verify token");

        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.iss, "saywrite-api");
        assert_eq!(claims.exp - claims.iat, config.access_ttl.as_secs());
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let config = config();
        let a = issue_access(&config, "a@example.com", config.access_ttl).unwrap();
        let b = issue_access(&config, "a@example.com", config.access_ttl).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_token_fails_access_verification() {
        let config = config();
        let refresh = issue_refresh(&config, "a@example.com", config.refresh_ttl).unwrap();
        let access = issue_access(&config, "a@example.com", config.access_ttl).unwrap();

        assert!(matches!(
            verify_access(&config, &refresh),
            Err(JwtError::InvalidSignature)
        ));
        assert!(matches!(
            verify_refresh(&config, &access),
            Err(JwtError::InvalidSignature)
        ));
        assert!(verify_refresh(&config, &refresh).is_ok());
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let config = config();
        let token = issue_access(&config, "a@example.com", Duration::ZERO).unwrap();
        assert!(matches!(
            verify_access(&config, &token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = config();
        let now = now_secs().unwrap();

        let claims = Claims {
            iss: config.issuer.clone(),
            sub: "a@example.com".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_access(&config, &token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_missing_subject_rejected() {
        let config = config();
        let now = now_secs().unwrap();
        let claims = serde_json::json!({
            "iss": config.issuer,
            "jti": Uuid::new_v4().to_string(),
            "iat": now,
            "exp": now + 600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_access(&config, &token),
            Err(JwtError::MissingSubject)
        ));

        let empty = issue_access(&config, "", config.access_ttl).unwrap();
        assert!(matches!(
            verify_access(&config, &empty),
            Err(JwtError::MissingSubject)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let config = config();
        assert!(matches!(
            verify_access(&config, "invalid.token.here"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_from_auth_config() {
        let auth = AuthConfig {
            access_token_expire_minutes: 15,
            refresh_token_expire_days: 2,
            ..Default::default()
        };
        let config = JwtConfig::from_auth_config(&auth);
        assert_eq!(config.access_expires_in(), 900);
        assert_eq!(config.refresh_ttl, Duration::from_secs(2 * 86_400));
        assert!(!format!("{config:?}").contains(&auth.secret_key));
    }

    #[test]
    fn test_from_auth_config_huge_lifetimes_saturate() {
        let auth = AuthConfig {
            access_token_expire_minutes: u64::MAX,
            refresh_token_expire_days: u64::MAX / 2,
            ..Default::default()
        };
        let config = JwtConfig::from_auth_config(&auth);
        assert_eq!(config.access_ttl, Duration::from_secs(u64::MAX));
        assert_eq!(config.refresh_ttl, Duration::from_secs(u64::MAX));
    }
}
