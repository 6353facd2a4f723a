// src/handlers/run.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    grading::runner::evaluate_code,
    models::question::{DEFAULT_CODE_LANGUAGE, TestCase},
    state::AppState,
    utils::text::is_blank,
};

/// DTO for the standalone code runner (practice IDE, lesson exercises).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub code: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    DEFAULT_CODE_LANGUAGE.to_string()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Runs code against the supplied test cases.
///
/// * 400 when the body is malformed or the code is empty.
/// * 500 when the execution service fails on any case (no partial results).
pub async fn run_code(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) if !is_blank(&req.code) => req,
        Ok(_) => return failure(StatusCode::BAD_REQUEST, "Invalid payload."),
        Err(rejection) => {
            tracing::debug!("Rejected run payload: {}", rejection);
            return failure(StatusCode::BAD_REQUEST, "Invalid payload.");
        }
    };

    match evaluate_code(
        state.executor.as_ref(),
        state.grader.as_ref(),
        &req.language,
        &req.code,
        &req.test_cases,
    )
    .await
    {
        Ok(report) => Json(json!({
            "success": true,
            "results": report.results,
            "allPassed": report.all_passed,
            "aiHint": report.ai_hint,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Runner error: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Execution failed.")
        }
    }
}
