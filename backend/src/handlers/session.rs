// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    grading::{
        runner::evaluate_code,
        scoring::grade,
        session::{ExamSession, SubmitTrigger, Submission},
        timer::{SessionHandle, spawn_countdown},
    },
    handlers::progress::insert_exam_result,
    models::{
        answer::AnswerInput,
        grading::{GradeReport, TestCaseResult},
        progress::SubmitExamResult,
        question::QuestionId,
    },
    state::AppState,
};

/// DTO for opening a session. `user_id` enables saving the result.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: AnswerInput,
}

#[derive(Debug, Deserialize)]
pub struct RunCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRunResponse {
    pub results: Vec<TestCaseResult>,
    pub all_passed: bool,
    pub ai_hint: Option<String>,
    /// Whether the pass was recorded on the session.
    pub recorded: bool,
}

async fn lookup(state: &AppState, id: &Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))
}

/// Grades a submission, stores the report on the session and, if the
/// session belongs to a user, saves the attempt.
///
/// Shared by manual submit and the countdown, so both behave the same.
/// Saving is best effort: a failure is logged and reported as `saved: false`.
pub async fn finalize_submission(
    state: &AppState,
    handle: &SessionHandle,
    submission: Submission,
) -> GradeReport {
    let exam = Arc::clone(&submission.exam);
    let report = grade(
        &exam.questions,
        &submission.answers,
        state.grader.as_ref(),
        exam.passing_score,
    )
    .await;

    tracing::info!(
        exam = %exam.id,
        trigger = ?submission.trigger,
        "Exam graded: {}/{} ({:.1}%)",
        report.total_score,
        report.total_points,
        report.percentage
    );

    let saved = match submission.user_id {
        Some(user_id) => Some(save_attempt(state, user_id, &submission, &report).await),
        None => None,
    };

    handle.lock().await.record_report(report.clone(), saved);
    report
}

async fn save_attempt(
    state: &AppState,
    user_id: i64,
    submission: &Submission,
    report: &GradeReport,
) -> bool {
    let exam = &submission.exam;
    let record = SubmitExamResult {
        course_id: exam.course_id.clone(),
        exam_title: exam.exam_title.clone(),
        exam_type: "exam".to_string(),
        score: f64::from(report.total_score),
        total_points: f64::from(report.total_points),
        percentage: report.percentage,
        passed: report.passed,
        time_spent_minutes: Some(submission.time_taken_secs.div_ceil(60) as i64),
        attempts: None,
        questions_data: Some(json!({
            "exam_id": exam.id,
            "trigger": submission.trigger,
            "answers": submission.answers,
            "results": report.results,
        })),
    };

    match insert_exam_result(&state.pool, user_id, &record).await {
        Ok(saved) => {
            tracing::info!("Saved exam result {} for user {}", saved.id, user_id);
            true
        }
        Err(e) => {
            tracing::warn!("Could not save exam result for user {}: {:?}", user_id, e);
            false
        }
    }
}

/// Opens a new session for an exam. The clock does not run until `start`.
pub async fn create_session(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam = state
        .catalog
        .get(&exam_id)
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))?;

    let session = ExamSession::new(exam, req.user_id);
    let view = session.view();
    let (id, _) = state.sessions.insert(session).await;
    tracing::info!("Opened session {} for exam {}", id, exam_id);

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    let view = handle.lock().await.view();
    Ok(Json(view))
}

/// Discards a session. Nothing is saved.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .remove(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Starts the exam and its countdown. When time runs out the session is
/// submitted exactly as if the learner had pressed submit.
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    let view = {
        let mut session = handle.lock().await;
        session.start()?;
        session.view()
    };

    let countdown_state = state.clone();
    let countdown_handle = Arc::clone(&handle);
    let task = spawn_countdown(Arc::clone(&handle), move |submission| async move {
        finalize_submission(&countdown_state, &countdown_handle, submission).await;
    });
    if !state.sessions.attach_countdown(&id, task.abort_handle()).await {
        // Discarded while starting; the countdown has been aborted.
        return Err(AppError::NotFound(format!("Session '{}' not found", id)));
    }

    tracing::info!("Started session {} ({}s on the clock)", id, view.remaining_secs);
    Ok(Json(view))
}

pub async fn record_answer(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, QuestionId)>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    session.record_answer(question_id, req.answer)?;

    Ok(Json(json!({
        "question_id": question_id,
        "answered": session.answers().len(),
        "unanswered": session.unanswered_count(),
    })))
}

pub async fn toggle_flag(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, QuestionId)>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    let flagged = handle.lock().await.toggle_flag(question_id)?;
    Ok(Json(json!({ "question_id": question_id, "flagged": flagged })))
}

/// Runs a code question's test cases. The session lock is not held while
/// the execution service works; a full pass is recorded afterwards, unless
/// the session was submitted in the meantime.
pub async fn run_code_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, QuestionId)>,
    Json(req): Json<RunCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("Code must not be empty".to_string()));
    }

    let handle = lookup(&state, &id).await?;
    let task = handle.lock().await.code_task(question_id)?;

    let report = evaluate_code(
        state.executor.as_ref(),
        state.grader.as_ref(),
        &task.language,
        &req.code,
        &task.test_cases,
    )
    .await
    .map_err(|e| {
        tracing::error!("Runner error in session {}: {}", id, e);
        AppError::InternalServerError(format!("Execution failed: {}", e))
    })?;

    let recorded = if report.all_passed {
        match handle.lock().await.record_code_pass(question_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Pass for question {} not recorded: {}", question_id, e);
                false
            }
        }
    } else {
        false
    };

    Ok(Json(SessionRunResponse {
        results: report.results,
        all_passed: report.all_passed,
        ai_hint: report.ai_hint,
        recorded,
    }))
}

/// Manual submit. A session can be submitted once; review afterwards goes
/// through `get_session` and never grades again.
pub async fn submit_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    let submission = handle.lock().await.submit(SubmitTrigger::Manual)?;

    finalize_submission(&state, &handle, submission).await;

    let view = handle.lock().await.view();
    Ok(Json(view))
}
