// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'exam_results' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub user_id: i64,
    pub course_id: String,
    pub exam_title: String,
    pub exam_type: String,
    pub score: f64,
    pub total_points: f64,
    pub percentage: f64,
    pub passed: bool,
    pub time_spent_minutes: Option<i64>,
    pub attempts: i64,
    pub questions_data: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

/// DTO for storing an exam attempt.
/// `attempts` is derived from earlier records when omitted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitExamResult {
    #[validate(length(min = 1, max = 50))]
    pub course_id: String,
    #[validate(length(min = 1, max = 200))]
    pub exam_title: String,
    #[serde(default = "default_exam_type")]
    #[validate(length(min = 1, max = 30))]
    pub exam_type: String,
    #[validate(range(min = 0.0))]
    pub score: f64,
    #[validate(range(min = 0.0))]
    pub total_points: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percentage: f64,
    pub passed: bool,
    #[validate(range(min = 0))]
    pub time_spent_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub attempts: Option<i64>,
    pub questions_data: Option<serde_json::Value>,
}

fn default_exam_type() -> String {
    "exam".to_string()
}

/// Represents the 'practice_results' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeResult {
    pub id: i64,
    pub user_id: i64,
    pub course_id: String,
    pub practice_title: String,
    pub practice_type: String,
    pub score: f64,
    pub total_points: f64,
    pub percentage: f64,
    pub time_spent_minutes: Option<i64>,
    pub attempts: i64,
    pub completed: bool,
    pub questions_data: Option<Json<serde_json::Value>>,
    pub feedback: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

/// DTO for storing a practice attempt.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitPracticeResult {
    #[validate(length(min = 1, max = 50))]
    pub course_id: String,
    #[validate(length(min = 1, max = 200))]
    pub practice_title: String,
    #[serde(default = "default_practice_type")]
    #[validate(length(min = 1, max = 30))]
    pub practice_type: String,
    #[validate(range(min = 0.0))]
    pub score: f64,
    #[validate(range(min = 0.0))]
    pub total_points: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percentage: f64,
    #[validate(range(min = 0))]
    pub time_spent_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub attempts: Option<i64>,
    #[serde(default = "default_true")]
    pub completed: bool,
    pub questions_data: Option<serde_json::Value>,
    pub feedback: Option<serde_json::Value>,
}

fn default_practice_type() -> String {
    "practice".to_string()
}

fn default_true() -> bool {
    true
}

/// Aggregated practice progress for one course.
#[derive(Debug, Serialize, FromRow)]
pub struct PracticeProgress {
    pub course_id: String,
    pub attempts: i64,
    pub completed_count: i64,
    pub best_percentage: Option<f64>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Represents the 'lesson_completions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub id: i64,
    pub user_id: i64,
    pub course_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub quiz_score: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// DTO for marking a lesson complete. Re-submitting overwrites the record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteLesson {
    #[validate(length(min = 1, max = 50))]
    pub course_id: String,
    #[validate(length(min = 1, max = 50))]
    pub lesson_id: String,
    #[serde(default = "default_true")]
    pub completed: bool,
    #[validate(range(min = 0, max = 100))]
    pub quiz_score: Option<i64>,
}
