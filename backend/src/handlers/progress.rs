// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::progress::{
        CompleteLesson, ExamResult, LessonCompletion, PracticeProgress, PracticeResult,
        SubmitExamResult, SubmitPracticeResult,
    },
};

/// Stores one exam attempt.
///
/// When the caller does not say which attempt this is, it is numbered after
/// the user's earlier attempts at the same exam. The count runs inside the
/// INSERT so concurrent submissions never share a number.
pub async fn insert_exam_result(
    pool: &SqlitePool,
    user_id: i64,
    req: &SubmitExamResult,
) -> Result<ExamResult, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO exam_results (
            user_id, course_id, exam_title, exam_type, score, total_points,
            percentage, passed, time_spent_minutes, attempts, questions_data, created_at
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
            COALESCE(?10, (
                SELECT COUNT(*) + 1 FROM exam_results
                WHERE user_id = ?1 AND course_id = ?2 AND exam_title = ?3
            )),
            ?11, ?12
        "#,
    )
    .bind(user_id)
    .bind(&req.course_id)
    .bind(&req.exam_title)
    .bind(&req.exam_type)
    .bind(req.score)
    .bind(req.total_points)
    .bind(req.percentage)
    .bind(req.passed)
    .bind(req.time_spent_minutes)
    .bind(req.attempts)
    .bind(req.questions_data.as_ref().map(SqlJson))
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query_as::<_, ExamResult>("SELECT * FROM exam_results WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Stores one practice attempt, numbered like [`insert_exam_result`].
pub async fn insert_practice_result(
    pool: &SqlitePool,
    user_id: i64,
    req: &SubmitPracticeResult,
) -> Result<PracticeResult, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO practice_results (
            user_id, course_id, practice_title, practice_type, score, total_points,
            percentage, time_spent_minutes, attempts, completed, questions_data,
            feedback, created_at
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            COALESCE(?9, (
                SELECT COUNT(*) + 1 FROM practice_results
                WHERE user_id = ?1 AND course_id = ?2 AND practice_title = ?3
            )),
            ?10, ?11, ?12, ?13
        "#,
    )
    .bind(user_id)
    .bind(&req.course_id)
    .bind(&req.practice_title)
    .bind(&req.practice_type)
    .bind(req.score)
    .bind(req.total_points)
    .bind(req.percentage)
    .bind(req.time_spent_minutes)
    .bind(req.attempts)
    .bind(req.completed)
    .bind(req.questions_data.as_ref().map(SqlJson))
    .bind(req.feedback.as_ref().map(SqlJson))
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query_as::<_, PracticeResult>("SELECT * FROM practice_results WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Saves an exam result for a user.
pub async fn submit_exam_result(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Json(req): Json<SubmitExamResult>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let record = insert_exam_result(&pool, user_id, &req)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam result: {:?}", e);
            AppError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Lists a user's exam results, newest first.
pub async fn list_exam_results(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, ExamResult>(
        "SELECT * FROM exam_results WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(results))
}

/// Lists a user's exam results for one course, newest first.
pub async fn list_course_exam_results(
    State(pool): State<SqlitePool>,
    Path((user_id, course_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, ExamResult>(
        "SELECT * FROM exam_results
         WHERE user_id = ? AND course_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Saves a practice result for a user.
pub async fn submit_practice_result(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Json(req): Json<SubmitPracticeResult>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let record = insert_practice_result(&pool, user_id, &req)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert practice result: {:?}", e);
            AppError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_practice_results(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, PracticeResult>(
        "SELECT * FROM practice_results WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

pub async fn list_course_practice_results(
    State(pool): State<SqlitePool>,
    Path((user_id, course_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, PracticeResult>(
        "SELECT * FROM practice_results
         WHERE user_id = ? AND course_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

#[derive(FromRow)]
struct PracticeAggregate {
    attempts: i64,
    completed_count: i64,
    best_percentage: Option<f64>,
    last_attempt_at: Option<DateTime<Utc>>,
}

/// Summarises a user's practice activity in one course.
pub async fn practice_progress(
    State(pool): State<SqlitePool>,
    Path((user_id, course_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, PracticeAggregate>(
        r#"
        SELECT
            COUNT(*) AS attempts,
            COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0) AS completed_count,
            MAX(percentage) AS best_percentage,
            MAX(created_at) AS last_attempt_at
        FROM practice_results
        WHERE user_id = ? AND course_id = ?
        "#,
    )
    .bind(user_id)
    .bind(&course_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(PracticeProgress {
        course_id,
        attempts: row.attempts,
        completed_count: row.completed_count,
        best_percentage: row.best_percentage,
        last_attempt_at: row.last_attempt_at,
    }))
}

/// Marks a lesson complete. Re-completing overwrites the earlier record.
pub async fn complete_lesson(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Json(req): Json<CompleteLesson>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    sqlx::query(
        r#"
        INSERT INTO lesson_completions (user_id, course_id, lesson_id, completed, quiz_score, completed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, course_id, lesson_id) DO UPDATE SET
            completed = excluded.completed,
            quiz_score = excluded.quiz_score,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(user_id)
    .bind(&req.course_id)
    .bind(&req.lesson_id)
    .bind(req.completed)
    .bind(req.quiz_score)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert lesson completion: {:?}", e);
        AppError::from(e)
    })?;

    let record = sqlx::query_as::<_, LessonCompletion>(
        "SELECT * FROM lesson_completions WHERE user_id = ? AND course_id = ? AND lesson_id = ?",
    )
    .bind(user_id)
    .bind(&req.course_id)
    .bind(&req.lesson_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn course_lesson_progress(
    State(pool): State<SqlitePool>,
    Path((user_id, course_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let completions = sqlx::query_as::<_, LessonCompletion>(
        "SELECT * FROM lesson_completions WHERE user_id = ? AND course_id = ? ORDER BY lesson_id",
    )
    .bind(user_id)
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(completions))
}
