//! User repository
//!
//! [`UserRepository`] is the only writer of user records. Two implementations:
//! - [`PgUserRepository`]: PostgreSQL via sqlx, one transaction per operation
//! - [`InMemoryUserRepository`]: process-local map for tests and local runs
//!
//! Password hashing and verification run on the blocking thread pool.

use super::models::{User, UserPatch};
use super::password::{dummy_verify, hash_password_with_config, verify_password, PasswordConfig};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("User with email {0} already exists")]
    AlreadyExists(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Unavailable(err.to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

/// Storage for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Hash `password` and insert a new active user
    async fn create(&self, email: &str, password: &str) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Check credentials
    ///
    /// Unknown email and wrong password both yield `Ok(None)`.
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<Option<User>, RepositoryError>;

    /// Apply an allow-listed update, returning `None` for an unknown id
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, RepositoryError>;
}

async fn hash_blocking(password: &str, config: &PasswordConfig) -> Result<String, RepositoryError> {
    let password = password.to_string();
    let config = config.clone();
    tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
        .await
        .map_err(|e| RepositoryError::Hashing(e.to_string()))?
        .map_err(|e| RepositoryError::Hashing(e.to_string()))
}

/// Verify `password` against `user`, or burn an equivalent verification when
/// there is no user
async fn check_credentials(
    user: Option<User>,
    password: &str,
    config: &PasswordConfig,
) -> Result<Option<User>, RepositoryError> {
    let password = password.to_string();
    let config = config.clone();
    tokio::task::spawn_blocking(move || match user {
        Some(user) if verify_password(&password, &user.password_hash) => Some(user),
        Some(_) => None,
        None => {
            dummy_verify(&password, &config);
            None
        }
    })
    .await
    .map_err(|e| RepositoryError::Hashing(e.to_string()))
}

// ============================================================================
// PostgreSQL
// ============================================================================

const USER_COLUMNS: &str = "id, email, password_hash, is_active, created_at, refresh_token";

/// PostgreSQL-backed user repository
///
/// Every operation runs in its own transaction. A transaction that is dropped
/// without commit is rolled back.
pub struct PgUserRepository {
    pool: PgPool,
    password_config: PasswordConfig,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            password_config: PasswordConfig::default(),
        }
    }

    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, email: &str, password: &str) -> Result<User, RepositoryError> {
        let password_hash = hash_blocking(password, &self.password_config).await?;
        let user = User::new(email.to_string(), password_hash);

        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(&user.refresh_token)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::AlreadyExists(_) => RepositoryError::AlreadyExists(email.to_string()),
            other => other,
        })?;
        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = self.find_by_email(email).await?;
        check_credentials(user, password, &self.password_config).await
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut user) = existing else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(user));
        }
        user.apply(&patch);

        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = $2, is_active = $3, refresh_token = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(user.is_active)
        .bind(&user.refresh_token)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::AlreadyExists(_) => RepositoryError::AlreadyExists(user.email.clone()),
            other => other,
        })?;
        tx.commit().await?;

        Ok(Some(updated))
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory user repository
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
    password_config: PasswordConfig,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, email: &str, password: &str) -> Result<User, RepositoryError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(RepositoryError::AlreadyExists(email.to_string()));
        }

        let password_hash = hash_blocking(password, &self.password_config).await?;
        let user = User::new(email.to_string(), password_hash);

        // Recheck under the write lock; a concurrent create may have won.
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(RepositoryError::AlreadyExists(email.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = self.find_by_email(email).await?;
        check_credentials(user, password, &self.password_config).await
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;

        if let Some(email) = &patch.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::AlreadyExists(email.clone()));
            }
        }

        Ok(users.get_mut(&id).map(|user| {
            user.apply(&patch);
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryUserRepository {
        InMemoryUserRepository::new().with_password_config(PasswordConfig::fast())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repo();
        let user = repo.create("a@example.com", "password123").await.unwrap();

        assert!(user.is_active);
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2id$"));

        let by_email = repo.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        assert!(repo.find_by_email("b@example.com").await.unwrap().is_none());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = repo();
        let original = repo.create("a@example.com", "password123").await.unwrap();
        let err = repo.create("a@example.com", "different1").await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(email) if email == "a@example.com"));

        let stored = repo.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.password_hash, original.password_hash);

        let authenticated = repo
            .authenticate("a@example.com", "password123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authenticated.id, original.id);
        assert!(repo
            .authenticate("a@example.com", "different1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let repo = repo();
        repo.create("a@example.com", "password123").await.unwrap();

        assert!(repo
            .authenticate("a@example.com", "password123")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .authenticate("a@example.com", "wrong-password")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .authenticate("nobody@example.com", "password123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_allow_list() {
        let repo = repo();
        let user = repo.create("a@example.com", "password123").await.unwrap();

        let updated = repo
            .update(
                user.id,
                UserPatch {
                    is_active: Some(false),
                    refresh_token: Some(Some("digest".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(updated.refresh_token.as_deref(), Some("digest"));
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(updated.created_at, user.created_at);

        assert!(repo
            .update(Uuid::new_v4(), UserPatch::refresh_token("x"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let repo = repo();
        repo.create("a@example.com", "password123").await.unwrap();
        let b = repo.create("b@example.com", "password123").await.unwrap();

        let err = repo
            .update(
                b.id,
                UserPatch {
                    email: Some("a@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
    }

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolTimedOut),
            RepositoryError::Unavailable(_)
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::Database(_)
        ));
    }
}
