//! SayWrite API - REST server
//!
//! Authentication (register, login, OAuth2 token, refresh), audio
//! transcription, and profile-driven rewriting over HTTP.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use axum::{routing::get, Json, Router};
use state::AppState;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document, served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(title = "SayWrite API", description = "Speech to text, then text to a polished draft"),
    paths(
        handlers::health::health_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::token_handler,
        handlers::auth::refresh_handler,
        handlers::auth::me_handler,
        handlers::transcribe::transcribe_handler,
        handlers::rewrite::rewrite_handler,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        auth::service::RegisterRequest,
        auth::service::LoginRequest,
        auth::service::TokenForm,
        auth::service::LoginResponse,
        auth::service::TokenResponse,
        auth::models::UserPublic,
        handlers::transcribe::TranscribeForm,
        handlers::transcribe::TranscribeResponse,
        handlers::rewrite::RewriteRequest,
        handlers::rewrite::RewriteResponse,
        handlers::rewrite::UsageMetrics,
        saywrite_core::Profile,
        saywrite_core::RewriteOptions,
        saywrite_core::ProviderHint,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "transcribe", description = "Speech to text"),
        (name = "rewrite", description = "Transcript rewriting"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let server_config = state.config.server.clone();

    let router = Router::new()
        .merge(routes::v1_routes(state.clone()))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state);

    routes::apply_layers(router, &server_config)
}

/// Router over an in-memory user store and stub providers
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(testing::test_state())
}
