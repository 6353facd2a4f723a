// src/handlers/health.rs

use axum::{Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "EduChatbot API is running!" }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
