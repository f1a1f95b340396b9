//! Authentication service layer
//!
//! [`UserService`] is a thin pass-through over the repository. [`AuthService`]
//! implements the token flows: login (access + refresh, refresh stored on the
//! user), OAuth2 password grant (access only), and refresh.

use super::jwt::{issue_access, issue_refresh, verify_access, verify_refresh, JwtConfig};
use super::models::{User, UserPatch, UserPublic};
use super::repository::{RepositoryError, UserRepository};
use crate::error::AppError;
use saywrite_core::SayWriteError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const BAD_LOGIN: &str = "Incorrect email or password";
const BAD_OAUTH_LOGIN: &str = "Incorrect username or password";
const BAD_CREDENTIALS: &str = "Could not validate credentials";

impl From<RepositoryError> for SayWriteError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists(_) => {
                SayWriteError::AlreadyExists("User with this email already exists".to_string())
            }
            RepositoryError::Unavailable(msg) => SayWriteError::ServiceUnavailable(msg),
            RepositoryError::Database(msg) | RepositoryError::Hashing(msg) => {
                SayWriteError::Internal(msg)
            }
        }
    }
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password grant form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenForm {
    /// Account email
    pub username: String,
    pub password: String,
}

/// Refresh token query parameter
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RefreshQuery {
    pub refresh_token: String,
}

/// Login response with both tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Access token response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Hex SHA-256 digest of a token, the form in which refresh tokens are stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// User management over a [`UserRepository`]
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, email: &str, password: &str) -> saywrite_core::Result<User> {
        Ok(self.repo.create(email, password).await?)
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> saywrite_core::Result<Option<User>> {
        Ok(self.repo.authenticate(email, password).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> saywrite_core::Result<Option<User>> {
        Ok(self.repo.find_by_email(email).await?)
    }

    pub async fn get_by_id(&self, id: Uuid) -> saywrite_core::Result<Option<User>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn update(&self, id: Uuid, patch: UserPatch) -> saywrite_core::Result<Option<User>> {
        Ok(self.repo.update(id, patch).await?)
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    jwt_config: JwtConfig,
}

impl AuthService {
    pub fn new(users: UserService, jwt_config: JwtConfig) -> Self {
        Self { users, jwt_config }
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    /// Register a new user
    ///
    /// Invalid input and a taken email are both `400`.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserPublic, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let user = self
            .users
            .register(&request.email, &request.password)
            .await?;
        tracing::info!(user_id = %user.id, email = %user.email, "User registered successfully");
        Ok(user.to_public())
    }

    /// Log in and rotate the stored refresh token
    ///
    /// The new refresh token replaces any earlier one, so only the most recent
    /// login's refresh token stays usable.
    pub async fn login(
        &self,
        request: LoginRequest,
    ) -> Result<(UserPublic, LoginResponse), AppError> {
        let user = self
            .users
            .authenticate(&request.email, &request.password)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_LOGIN.to_string()))?;

        let access_token = self.access_token_for(&user.email)?;
        let refresh_token = issue_refresh(&self.jwt_config, &user.email, self.jwt_config.refresh_ttl)
            .map_err(|e| AppError::Internal(format!("Failed to generate refresh token: {e}")))?;

        self.users
            .update(user.id, UserPatch::refresh_token(hash_token(&refresh_token)))
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_LOGIN.to_string()))?;

        tracing::info!(user_id = %user.id, email = %user.email, "User logged in successfully");
        let response = LoginResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt_config.access_expires_in(),
        };
        Ok((user.to_public(), response))
    }

    /// OAuth2 password grant: access token only, nothing persisted
    pub async fn token(&self, form: TokenForm) -> Result<(UserPublic, TokenResponse), AppError> {
        let user = self
            .users
            .authenticate(&form.username, &form.password)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_OAUTH_LOGIN.to_string()))?;

        tracing::info!(user_id = %user.id, email = %user.email, "OAuth2 token issued successfully");
        Ok((user.to_public(), self.token_response(&user.email)?))
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Returns the subject email alongside the response for audit logging.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, TokenResponse), AppError> {
        let claims = verify_refresh(&self.jwt_config, refresh_token).map_err(|e| {
            tracing::warn!(error = %e, "Refresh token failed verification");
            AppError::Unauthorized(BAD_CREDENTIALS.to_string())
        })?;

        let user = self.users.get_by_email(&claims.sub).await?.ok_or_else(|| {
            tracing::warn!(email = %claims.sub, "Refresh token failed - unknown user");
            AppError::Unauthorized(BAD_CREDENTIALS.to_string())
        })?;

        if user.refresh_token.as_deref() != Some(hash_token(refresh_token).as_str()) {
            tracing::warn!(email = %user.email, "Refresh token failed - token does not match");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        tracing::info!(user_id = %user.id, email = %user.email, "Refreshed access token issued");
        Ok((user.email.clone(), self.token_response(&user.email)?))
    }

    /// Resolve the user behind an access token
    ///
    /// Inactive users are returned as-is; rejecting them is up to the caller.
    pub async fn user_for_access_token(&self, token: &str) -> Result<User, AppError> {
        let claims = verify_access(&self.jwt_config, token)
            .map_err(|_| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        self.users
            .get_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))
    }

    fn access_token_for(&self, email: &str) -> Result<String, AppError> {
        issue_access(&self.jwt_config, email, self.jwt_config.access_ttl)
            .map_err(|e| AppError::Internal(format!("Failed to generate access token: {e}")))
    }

    fn token_response(&self, email: &str) -> Result<TokenResponse, AppError> {
        Ok(TokenResponse {
            access_token: self.access_token_for(email)?,
            token_type: "bearer".to_string(),
            expires_in: self.jwt_config.access_expires_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordConfig;
    use crate::auth::repository::InMemoryUserRepository;

    fn service() -> AuthService {
        let repo = InMemoryUserRepository::new().with_password_config(PasswordConfig::fast());
        let jwt = JwtConfig {
            access_secret: "access".to_string(),
            refresh_secret: "refresh".to_string(),
            ..Default::default()
        };
        AuthService::new(UserService::new(Arc::new(repo)), jwt)
    }

    async fn registered(service: &AuthService) -> UserPublic {
        service
            .register(RegisterRequest {
                email: "user@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap()
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            email: "user@example.com".to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn test_hash_token() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = service();
        let short = service
            .register(RegisterRequest {
                email: "user@example.com".to_string(),
                password: "short".to_string(),
            })
            .await;
        assert!(matches!(short, Err(AppError::BadRequest(_))));

        let bad_email = service
            .register(RegisterRequest {
                email: "not-an-email".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(bad_email, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_login_stores_refresh_digest() {
        let service = service();
        let user = registered(&service).await;

        let (_, response) = service.login(login_request()).await.unwrap();
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.expires_in, 30 * 60);

        let stored = service.users().get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(hash_token(&response.refresh_token).as_str())
        );
        assert_ne!(stored.refresh_token.as_deref(), Some(response.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn test_refresh_only_latest_token() {
        let service = service();
        registered(&service).await;

        let (_, first) = service.login(login_request()).await.unwrap();
        let (email, _) = service.refresh(&first.refresh_token).await.unwrap();
        assert_eq!(email, "user@example.com");

        let (_, second) = service.login(login_request()).await.unwrap();
        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(service.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let service = service();
        registered(&service).await;
        let (_, tokens) = service.login(login_request()).await.unwrap();

        assert!(service.refresh(&tokens.access_token).await.is_err());
        assert!(service
            .user_for_access_token(&tokens.refresh_token)
            .await
            .is_err());
        assert!(service
            .user_for_access_token(&tokens.access_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_bad_credentials_messages() {
        let service = service();
        registered(&service).await;

        let login = service
            .login(LoginRequest {
                email: "user@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(login, Err(AppError::Unauthorized(msg)) if msg == BAD_LOGIN));

        let oauth = service
            .token(TokenForm {
                username: "nobody@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(oauth, Err(AppError::Unauthorized(msg)) if msg == BAD_OAUTH_LOGIN));
    }

    #[tokio::test]
    async fn test_oauth_token_does_not_touch_refresh() {
        let service = service();
        let user = registered(&service).await;

        let (public, response) = service
            .token(TokenForm {
                username: "user@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.token_type, "bearer");
        assert_eq!(public.id, user.id);

        let stored = service.users().get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }
}
