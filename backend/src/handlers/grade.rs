// src/handlers/grade.rs

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    clients::GradeRequest,
    grading::scoring::FEEDBACK_NO_ANSWER,
    models::grading::GradingResult,
    state::AppState,
    utils::text::{is_blank, matches_any_alternative},
};

const GRADE_ERROR_FEEDBACK: &str = "Error grading your response.";

fn grading_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(GradingResult::incorrect(GRADE_ERROR_FEEDBACK)),
    )
        .into_response()
}

/// AI grading proxy for a single free-text answer.
///
/// Returns the model's `{correct, feedback}` verdict. Any failure is a 500
/// carrying an "incorrect" verdict so clients can render it unchanged.
pub async fn grade_answer(
    State(state): State<AppState>,
    Json(req): Json<GradeRequest>,
) -> Response {
    match state.grader.grade_answer(&req).await {
        Ok(verdict) => Json(verdict).into_response(),
        Err(e) => {
            tracing::error!("Grading error: {}", e);
            grading_failed()
        }
    }
}

/// DTO for the lesson quiz check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCheckRequest {
    #[serde(default = "default_quiz_question")]
    pub question: String,
    /// May list accepted alternatives separated by `|`.
    pub expected_answer: String,
    pub student_answer: String,
}

fn default_quiz_question() -> String {
    "grading fill blank".to_string()
}

/// Lesson quiz check.
///
/// * A direct (case-insensitive) match against any accepted alternative wins
///   without asking the model.
/// * Otherwise the model's verdict is returned.
pub async fn check_quiz_answer(
    State(state): State<AppState>,
    Json(req): Json<QuizCheckRequest>,
) -> Response {
    if is_blank(&req.student_answer) {
        return Json(GradingResult::incorrect(FEEDBACK_NO_ANSWER)).into_response();
    }

    if matches_any_alternative(&req.expected_answer, &req.student_answer) {
        return Json(GradingResult::new(true, "Correct!")).into_response();
    }

    let request = GradeRequest {
        question: req.question,
        expected_answer: req.expected_answer,
        student_answer: req.student_answer,
    };

    match state.grader.grade_answer(&request).await {
        Ok(verdict) => Json(GradingResult::new(verdict.correct, verdict.feedback)).into_response(),
        Err(e) => {
            tracing::error!("Quiz grading error: {}", e);
            grading_failed()
        }
    }
}
