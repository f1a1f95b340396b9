//! User account models
//!
//! - User: stored account, including credential material
//! - UserPublic: projection returned by the API
//! - UserPatch: the allow-listed set of mutable fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User account model
///
/// Maps to the `users` table. Only the repository writes these records.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// User's email address (unique, used for login)
    pub email: String,

    /// Hashed password (Argon2id PHC string)
    /// This field is never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether the account is active
    pub is_active: bool,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// SHA-256 hex digest of the current refresh token
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
}

impl User {
    /// Create a new active user with the given credentials
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            is_active: true,
            created_at: Utc::now(),
            refresh_token: None,
        }
    }

    /// Apply an allow-listed update in place
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(refresh_token) = &patch.refresh_token {
            self.refresh_token = refresh_token.clone();
        }
    }

    /// Convert to public representation (without sensitive data)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// Public user information (safe to return in API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        user.to_public()
    }
}

/// Partial update of a user
///
/// Fields left as `None` are untouched. `refresh_token: Some(None)` clears
/// the stored token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub refresh_token: Option<Option<String>>,
}

impl UserPatch {
    pub fn refresh_token(digest: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(Some(digest.into())),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.is_active.is_none() && self.refresh_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_hides_secrets() {
        let mut user = User::new("test@example.com".to_string(), "$argon2id$hash".to_string());
        user.refresh_token = Some("digest".to_string());

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id$hash"));
        assert!(!json.contains("digest"));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_apply_patch() {
        let mut user = User::new("a@example.com".to_string(), "hash".to_string());
        user.refresh_token = Some("old".to_string());

        user.apply(&UserPatch {
            is_active: Some(false),
            ..Default::default()
        });
        assert!(!user.is_active);
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.refresh_token.as_deref(), Some("old"));

        user.apply(&UserPatch {
            refresh_token: Some(None),
            ..Default::default()
        });
        assert_eq!(user.refresh_token, None);
    }

    #[test]
    fn test_to_public() {
        let user = User::new("a@example.com".to_string(), "hash".to_string());
        let public = user.to_public();
        assert_eq!(public.id, user.id);
        assert_eq!(public.email, user.email);
        assert!(public.is_active);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch::refresh_token("x").is_empty());
    }
}
