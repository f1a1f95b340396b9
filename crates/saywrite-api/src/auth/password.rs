/// Password hashing and verification using Argon2id
///
/// Default parameters follow OWASP recommendations:
/// - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random
/// - Output: 32 bytes hash
///
/// The cost parameters live in [`PasswordConfig`] so tests and small
/// deployments can trade strength for speed.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use std::sync::OnceLock;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
}

/// Password hashing configuration
///
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests
    pub fn fast() -> Self {
        Self {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))
    }
}

/// Hash a plaintext password with the default configuration
///
/// Returns a PHC string (algorithm, parameters, salt and hash), safe to store.
///
/// # Example
///
/// ```no_run
/// use saywrite_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("password123").expect("Failed to hash password");
/// assert!(verify_password("password123", &hash));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_config(password, &PasswordConfig::default())
}

/// Hash a password with custom configuration
pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Parameters are read from the PHC string, so hashes made with any
/// [`PasswordConfig`] verify. A mismatch or an unparseable hash yields `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn one verification against a fixed hash
///
/// Used when the account does not exist so the response time does not reveal
/// whether the email is registered.
pub fn dummy_verify(password: &str, config: &PasswordConfig) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| hash_password_with_config("dummy-password", config).ok());
    if let Some(hash) = hash {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "SecureP@ssw0rd!";
        let hash = hash_password_with_config(password, &PasswordConfig::fast())
            .expect("Failed to hash password");

        assert!(verify_password(password, &hash));
        assert!(!verify_password("WrongPassword", &hash));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let config = PasswordConfig::fast();
        let password = "SamePassword123!";

        let hash1 = hash_password_with_config(password, &config).unwrap();
        let hash2 = hash_password_with_config(password, &config).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1));
        assert!(verify_password(password, &hash2));
    }

    #[test]
    fn test_invalid_hash_format_is_mismatch() {
        assert!(!verify_password("password", "invalid-hash-format"));
        assert!(!verify_password("password", ""));
    }

    #[test]
    fn test_custom_config() {
        let config = PasswordConfig {
            memory_cost: 16384,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };

        let password = "TestPassword123!";
        let hash = hash_password_with_config(password, &config).unwrap();

        assert!(verify_password(password, &hash));
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=16384"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = PasswordConfig {
            memory_cost: 1,
            ..PasswordConfig::fast()
        };
        assert!(matches!(
            hash_password_with_config("password", &config),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_hash_does_not_contain_plaintext() {
        let hash = hash_password_with_config("password123", &PasswordConfig::fast()).unwrap();
        assert!(!hash.contains("password123"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_verify_accepts_only_hashed_password(password in "[ -~]{8,32}", other in "[ -~]{8,32}") {
            let hash = hash_password_with_config(&password, &PasswordConfig::fast()).unwrap();
            prop_assert!(verify_password(&password, &hash));
            if other != password {
                prop_assert!(!verify_password(&other, &hash));
            }
        }
    }
}
