//! Database bootstrap
//!
//! Pool construction, idempotent schema creation, and the optional test user.
//!
//! Author: hephaex@gmail.com

use crate::auth::repository::{RepositoryError, UserRepository};
use saywrite_core::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Email of the account created by [`seed_test_user`]
pub const TEST_USER_EMAIL: &str = "test@example.com";
const TEST_USER_PASSWORD: &str = "password";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    refresh_token TEXT
)
"#;

/// Build a connection pool
///
/// Connections are opened on demand, so the server starts even when the
/// database is down; requests then fail after `acquire_timeout_secs`.
pub fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy(&config.url)
}

/// Create the `users` table if it does not exist
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema ready");
    Ok(())
}

/// Register the test account, skipping it if it already exists
pub async fn seed_test_user(repo: &dyn UserRepository) -> Result<(), RepositoryError> {
    match repo.create(TEST_USER_EMAIL, TEST_USER_PASSWORD).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, email = TEST_USER_EMAIL, "Test user created");
            Ok(())
        }
        Err(RepositoryError::AlreadyExists(_)) => {
            tracing::info!(email = TEST_USER_EMAIL, "Test user already exists, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
