/// Authentication middleware for protecting routes
///
/// Extracts and validates the bearer token from the Authorization header,
/// resolves the user it names, and rejects inactive accounts. On success the
/// user is added to request extensions as [`CurrentUser`].
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::models::UserPublic;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// The authenticated, active user making the request
///
/// Extract in handlers with `Extension(CurrentUser(user))`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserPublic);

/// Pull the token out of `Authorization: Bearer <token>`
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authentication middleware that requires a valid access token
///
/// 1. Missing or malformed header: 401
/// 2. Token fails access verification: 401
/// 3. Subject does not resolve to a user: 401
/// 4. User is inactive: 400 "Inactive user"
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use saywrite_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip_address = extract_ip_address(request.headers());
    let user_agent = extract_user_agent(request.headers());

    let Some(token) = bearer_token(request.headers()) else {
        audit_log(&AuditEvent::InvalidToken {
            reason: "Missing or malformed Authorization header".to_string(),
            ip_address,
            user_agent,
        });
        return Err(AppError::Unauthorized("Not authenticated".to_string()));
    };

    let user = match state.auth.user_for_access_token(token).await {
        Ok(user) => user,
        Err(err) => {
            if let AppError::Unauthorized(reason) = &err {
                audit_log(&AuditEvent::InvalidToken {
                    reason: reason.clone(),
                    ip_address,
                    user_agent,
                });
            }
            return Err(err);
        }
    };

    if !user.is_active {
        audit_log(&AuditEvent::InactiveUser {
            user_id: user.id,
            email: user.email.clone(),
            ip_address,
        });
        return Err(AppError::BadRequest("Inactive user".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(user.to_public()));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
