//! Authentication and authorization module
//!
//! - Token issuing and verification (separate access and refresh secrets)
//! - Password hashing with Argon2
//! - User repository (PostgreSQL and in-memory)
//! - User and authentication services
//! - Middleware for request authentication

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;

pub use jwt::{issue_access, issue_refresh, verify_access, verify_refresh, Claims, JwtConfig};
pub use middleware::{auth_middleware, CurrentUser};
pub use models::{User, UserPatch, UserPublic};
pub use password::{hash_password, verify_password, PasswordConfig};
pub use repository::{InMemoryUserRepository, PgUserRepository, RepositoryError, UserRepository};
pub use service::{
    AuthService, LoginRequest, LoginResponse, RegisterRequest, TokenForm, TokenResponse,
    UserService,
};
