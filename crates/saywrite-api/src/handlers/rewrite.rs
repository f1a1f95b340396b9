//! Rewrite handler
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use saywrite_core::{Profile, RewriteOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Rewrite request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewriteRequest {
    pub transcript: String,
    pub profile: Profile,
    #[serde(default)]
    pub options: RewriteOptions,
}

/// Stage timings in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageMetrics {
    /// Always 0 here; transcription is a separate call
    pub stt_ms: u64,
    pub llm_ms: u64,
}

/// Rewrite result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewriteResponse {
    pub draft: String,
    pub usage: UsageMetrics,
}

/// Rewrite a transcript with a profile
///
/// A provider that is not configured (for example a missing API key) is a
/// `400`; any other provider failure is a `500`.
#[utoipa::path(
    post,
    path = "/v1/rewrite",
    tag = "rewrite",
    request_body = RewriteRequest,
    responses(
        (status = 200, description = "Rewritten draft", body = RewriteResponse),
        (status = 400, description = "Missing transcript or provider not configured", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Rewrite failed", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rewrite_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<RewriteRequest>,
) -> Result<Json<RewriteResponse>, AppError> {
    tracing::info!(
        profile_id = %request.profile.id,
        profile_name = %request.profile.name,
        transcript_length = request.transcript.len(),
        user_id = %user.id,
        "Rewrite request received"
    );

    if request.transcript.trim().is_empty() {
        return Err(AppError::BadRequest("Transcript is required".to_string()));
    }

    let rewrite = state
        .llm
        .rewrite(&request.transcript, &request.profile, &request.options)
        .await
        .map_err(|e| {
            tracing::error!(provider = state.llm.name(), error = %e, "Error in rewrite");
            if e.is_configuration() {
                AppError::BadRequest(e.to_string())
            } else {
                AppError::Upstream(format!("Error rewriting text: {e}"))
            }
        })?;

    Ok(Json(RewriteResponse {
        draft: rewrite.text,
        usage: UsageMetrics {
            stt_ms: 0,
            llm_ms: rewrite.elapsed_ms,
        },
    }))
}
