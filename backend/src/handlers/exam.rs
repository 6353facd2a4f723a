// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading::catalog::ExamCatalog,
    models::exam::{ExamSummary, PublicExam},
};

/// Lists every exam in the catalog.
pub async fn list_exams(State(catalog): State<Arc<ExamCatalog>>) -> impl IntoResponse {
    let exams: Vec<ExamSummary> = catalog.iter().map(|e| ExamSummary::from(e.as_ref())).collect();
    Json(exams)
}

/// Returns one exam without its answer keys.
pub async fn get_exam(
    State(catalog): State<Arc<ExamCatalog>>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = catalog
        .get(&exam_id)
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))?;

    Ok(Json(PublicExam::from(exam.as_ref())))
}
