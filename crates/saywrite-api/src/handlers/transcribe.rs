//! Transcription handler
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use utoipa::ToSchema;

/// Transcription result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Multipart form accepted by `/v1/transcribe`
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct TranscribeForm {
    /// Audio file
    #[schema(value_type = String, format = Binary)]
    pub audio: Vec<u8>,
    /// Optional language hint, e.g. "en"
    pub language: Option<String>,
}

struct Upload {
    file_name: String,
    bytes: axum::body::Bytes,
}

/// Temp file suffix carrying the upload's extension, so decoders that sniff
/// by name still work
fn upload_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Transcribe an uploaded audio file
///
/// The upload is written to a temporary file which is removed afterwards.
#[utoipa::path(
    post,
    path = "/v1/transcribe",
    tag = "transcribe",
    request_body(content = TranscribeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Transcribed text", body = TranscribeResponse),
        (status = 400, description = "Audio file is required", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Transcription failed", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn transcribe_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, AppError> {
    let mut upload: Option<Upload> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read audio: {e}")))?;
                upload = Some(Upload { file_name, bytes });
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid language field: {e}")))?;
                language = Some(value.trim().to_string()).filter(|l| !l.is_empty());
            }
            _ => {}
        }
    }

    let upload = upload
        .filter(|u| !u.file_name.is_empty())
        .ok_or_else(|| AppError::BadRequest("Audio file is required".to_string()))?;

    tracing::info!(
        filename = %upload.file_name,
        language = ?language,
        user_id = %user.id,
        "Transcribe request received"
    );

    let temp = tempfile::Builder::new()
        .prefix("saywrite-")
        .suffix(&upload_suffix(&upload.file_name))
        .tempfile()
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;
    tokio::fs::write(temp.path(), &upload.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write temp file: {e}")))?;

    let result = state.stt.transcribe(temp.path(), language.as_deref()).await;

    let temp_path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
    }

    let transcription = result.map_err(|e| {
        tracing::error!(provider = state.stt.name(), error = %e, "Error transcribing audio");
        AppError::Upstream(format!("Error transcribing audio: {e}"))
    })?;

    tracing::info!(
        stt_ms = transcription.elapsed_ms,
        chars = transcription.text.len(),
        "Transcription completed"
    );

    Ok(Json(TranscribeResponse {
        text: transcription.text,
    }))
}
