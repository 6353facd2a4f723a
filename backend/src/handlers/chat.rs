// src/handlers/chat.rs

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::chat::{ChatReply, ChatRequest, Role},
    state::AppState,
};

/// Tutoring chat proxy. The tutor persona is added by the tutor itself;
/// callers may not inject their own system messages.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    if req.messages.iter().any(|m| m.role == Role::System) {
        return Err(AppError::BadRequest(
            "System messages are not accepted".to_string(),
        ));
    }

    let content = state.tutor.reply(&req.messages).await.map_err(|e| {
        tracing::error!("Chat API error: {}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ChatReply { content }))
}
