//! Authentication API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::middleware::CurrentUser;
use crate::auth::service::{
    LoginRequest, LoginResponse, RefreshQuery, RegisterRequest, TokenForm, TokenResponse,
};
use crate::auth::models::UserPublic;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Form, Json,
};
use std::sync::Arc;

fn failure_reason(err: &AppError) -> String {
    match err {
        AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::Upstream(msg) => {
            msg.clone()
        }
        AppError::ServiceUnavailable(_) => "Service unavailable".to_string(),
        AppError::Internal(_) => "Internal error".to_string(),
    }
}

/// Register a new user account
///
/// # Responses
///
/// * `200 OK` - User registered
/// * `400 Bad Request` - Invalid input or email already registered
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = UserPublic),
        (status = 400, description = "Invalid input or duplicate email", body = crate::error::ApiError),
        (status = 503, description = "Database unavailable", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = request.email.clone();
    tracing::info!(email = %email, "User registration attempt");

    match state.auth.register(request).await {
        Ok(user) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: user.id,
                email: user.email.clone(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(user))
        }
        Err(err) => {
            audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: failure_reason(&err),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(err)
        }
    }
}

/// Login with email and password
///
/// Returns an access token and a refresh token. The refresh token replaces
/// any earlier one for the account.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Incorrect email or password", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = request.email.clone();
    tracing::info!(email = %email, "User login attempt");

    match state.auth.login(request).await {
        Ok((user, response)) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: user.id,
                email: user.email,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(response))
        }
        Err(err) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: failure_reason(&err),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(err)
        }
    }
}

/// OAuth2 password grant
///
/// Form fields `username` (the account email) and `password`. Returns an
/// access token only.
#[utoipa::path(
    post,
    path = "/v1/auth/token",
    tag = "auth",
    request_body(content = TokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = crate::error::ApiError),
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Result<impl IntoResponse, AppError> {
    let username = form.username.clone();
    tracing::info!(username = %username, "OAuth2 token request");

    match state.auth.token(form).await {
        Ok((user, response)) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: user.id,
                email: user.email,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(response))
        }
        Err(err) => {
            audit_log(&AuditEvent::LoginFailure {
                email: username,
                reason: failure_reason(&err),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(err)
        }
    }
}

/// Exchange a refresh token for a new access token
///
/// Only the refresh token from the account's most recent login is accepted.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh_token",
    tag = "auth",
    params(RefreshQuery),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Invalid, expired, or superseded refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("Refresh token request");

    match state.auth.refresh(&query.refresh_token).await {
        Ok((email, response)) => {
            audit_log(&AuditEvent::TokenRefresh {
                email,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(response))
        }
        Err(err) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: format!("Refresh rejected: {}", failure_reason(&err)),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(err)
        }
    }
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 400, description = "Inactive user", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserPublic> {
    Json(user)
}
