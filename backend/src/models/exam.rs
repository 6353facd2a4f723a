// src/models/exam.rs

use std::{borrow::Cow, collections::HashSet};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::question::{PublicQuestion, Question, QuestionKind};

/// A quiz or exam definition, loaded from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExamConfig {
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    /// e.g. "cs141"
    #[validate(length(min = 1, max = 50))]
    pub course_id: String,

    #[validate(length(min = 1, max = 200))]
    pub exam_title: String,

    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: u32,

    /// Percentage needed to pass.
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: f64,

    #[serde(default = "default_true")]
    pub allow_review: bool,

    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

fn default_true() -> bool {
    true
}

impl ExamConfig {
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

/// Rejects question lists the scoring engine cannot grade unambiguously.
fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.is_empty() {
        return Err(ValidationError::new("questions_cannot_be_empty"));
    }

    let mut seen = HashSet::new();
    for q in questions {
        if !seen.insert(q.id) {
            return Err(invalid(
                "duplicate_question_id",
                format!("question id {} appears more than once", q.id),
            ));
        }

        match &q.kind {
            QuestionKind::ChoiceSingle {
                options,
                correct_index,
            } => {
                if options.is_empty() {
                    return Err(invalid(
                        "options_cannot_be_empty",
                        format!("question {} has no options", q.id),
                    ));
                }
                if *correct_index >= options.len() {
                    return Err(invalid(
                        "correct_index_out_of_range",
                        format!("question {} points at a missing option", q.id),
                    ));
                }
            }
            QuestionKind::Boolean { correct_index } if *correct_index > 1 => {
                return Err(invalid(
                    "correct_index_out_of_range",
                    format!("true/false question {} must use index 0 or 1", q.id),
                ));
            }
            QuestionKind::FillBlank { expected_answer } if expected_answer.trim().is_empty() => {
                return Err(invalid(
                    "expected_answer_empty",
                    format!("question {} has no expected answer", q.id),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Catalog listing entry.
#[derive(Debug, Serialize)]
pub struct ExamSummary {
    pub id: String,
    pub course_id: String,
    pub exam_title: String,
    pub duration_minutes: u32,
    pub passing_score: f64,
    pub total_points: u32,
    pub question_count: usize,
}

impl From<&ExamConfig> for ExamSummary {
    fn from(exam: &ExamConfig) -> Self {
        Self {
            id: exam.id.clone(),
            course_id: exam.course_id.clone(),
            exam_title: exam.exam_title.clone(),
            duration_minutes: exam.duration_minutes,
            passing_score: exam.passing_score,
            total_points: exam.total_points(),
            question_count: exam.questions.len(),
        }
    }
}

/// DTO for returning an exam to a learner (no answer keys).
#[derive(Debug, Serialize)]
pub struct PublicExam {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub allow_review: bool,
    pub questions: Vec<PublicQuestion>,
}

impl From<&ExamConfig> for PublicExam {
    fn from(exam: &ExamConfig) -> Self {
        Self {
            summary: ExamSummary::from(exam),
            allow_review: exam.allow_review,
            questions: exam.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exam(questions: serde_json::Value) -> ExamConfig {
        serde_json::from_value(json!({
            "id": "demo",
            "course_id": "cs141",
            "exam_title": "Demo",
            "duration_minutes": 10,
            "passing_score": 70.0,
            "questions": questions
        }))
        .unwrap()
    }

    #[test]
    fn valid_exam_passes_validation() {
        let exam = exam(json!([
            {"id": 1, "type": "multiple-choice", "question": "Q", "points": 10,
             "options": ["a", "b"], "correct_index": 1},
            {"id": 2, "type": "code", "question": "Q", "points": 20, "test_cases": []}
        ]));
        assert!(exam.validate().is_ok());
        assert_eq!(exam.total_points(), 30);
        assert_eq!(exam.duration_secs(), 600);
        assert!(exam.allow_review);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let exam = exam(json!([
            {"id": 1, "type": "true-false", "question": "Q", "points": 10, "correct_index": 0},
            {"id": 1, "type": "true-false", "question": "Q", "points": 10, "correct_index": 1}
        ]));
        let err = exam.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let exam = exam(json!([
            {"id": 1, "type": "multiple-choice", "question": "Q", "points": 10,
             "options": ["a"], "correct_index": 1}
        ]));
        assert!(exam.validate().is_err());
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert!(exam(json!([])).validate().is_err());
    }
}
