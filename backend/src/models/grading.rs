// src/models/grading.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::question::QuestionId;

/// Correctness verdict and feedback text for one question in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub correct: bool,
    pub feedback: String,
}

impl GradingResult {
    pub fn new(correct: bool, feedback: impl Into<String>) -> Self {
        Self {
            correct,
            feedback: feedback.into(),
        }
    }

    pub fn incorrect(feedback: impl Into<String>) -> Self {
        Self::new(false, feedback)
    }
}

/// Outcome of grading a whole quiz or exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub results: BTreeMap<QuestionId, GradingResult>,
    pub total_score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
}

impl GradeReport {
    pub fn correct_count(&self) -> usize {
        self.results.values().filter(|r| r.correct).count()
    }
}

/// Outcome of running one test case against submitted code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub input: String,
    pub expected: String,
    /// Collaborator output after trimming.
    pub output: String,
    pub passed: bool,
}

/// Outcome of a full code run, as returned to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub results: Vec<TestCaseResult>,
    pub all_passed: bool,
    pub ai_hint: Option<String>,
}
