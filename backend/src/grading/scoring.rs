// src/grading/scoring.rs

use std::collections::BTreeMap;

use crate::{
    clients::{AiGrader, GradeRequest},
    models::{
        answer::{Answer, AnswerStore},
        grading::{GradeReport, GradingResult},
        question::{Question, QuestionKind},
    },
    utils::text::is_blank,
};

pub const FEEDBACK_CORRECT: &str = "Correct";
pub const FEEDBACK_INCORRECT: &str = "Incorrect";
pub const FEEDBACK_CODE_PASSED: &str = "All test cases passed!";
pub const FEEDBACK_CODE_FAILED: &str = "Not all test cases passed";
pub const FEEDBACK_NO_ANSWER: &str = "No answer provided";
pub const FEEDBACK_GRADING_ERROR: &str = "Error grading response";

/// Grades every question against the learner's answers.
///
/// * Questions are processed strictly in order, one collaborator call at a time.
/// * A failing AI call only marks its own question incorrect.
/// * Points are awarded iff the result is correct; a repeated question id is graded once.
pub async fn grade(
    questions: &[Question],
    answers: &AnswerStore,
    grader: &dyn AiGrader,
    passing_score: f64,
) -> GradeReport {
    let mut results = BTreeMap::new();
    let mut total_score = 0;
    let mut total_points = 0;

    for question in questions {
        if results.contains_key(&question.id) {
            tracing::warn!("Skipping duplicate question id {}", question.id);
            continue;
        }

        let result = grade_question(question, answers.get(question.id), grader).await;
        if result.correct {
            total_score += question.points;
        }
        total_points += question.points;
        results.insert(question.id, result);
    }

    let percentage = percentage(total_score, total_points);

    GradeReport {
        results,
        total_score,
        total_points,
        percentage,
        passed: percentage >= passing_score,
    }
}

pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(score) / f64::from(total) * 100.0
}

async fn grade_question(
    question: &Question,
    answer: Option<&Answer>,
    grader: &dyn AiGrader,
) -> GradingResult {
    match &question.kind {
        QuestionKind::ChoiceSingle { correct_index, .. }
        | QuestionKind::Boolean { correct_index } => {
            let correct = matches!(answer, Some(Answer::Choice(i)) if i == correct_index);
            exact(correct)
        }
        QuestionKind::Code { .. } => {
            if matches!(answer, Some(Answer::CodePassed)) {
                GradingResult::new(true, FEEDBACK_CODE_PASSED)
            } else {
                GradingResult::incorrect(FEEDBACK_CODE_FAILED)
            }
        }
        QuestionKind::FillBlank { expected_answer } => {
            let student = match answer {
                Some(Answer::Text(text)) if !is_blank(text) => text,
                Some(Answer::Text(_)) | None => {
                    return GradingResult::incorrect(FEEDBACK_NO_ANSWER);
                }
                Some(_) => return exact(false),
            };

            let request = GradeRequest {
                question: question.prompt.clone(),
                expected_answer: expected_answer.clone(),
                student_answer: student.clone(),
            };

            match grader.grade_answer(&request).await {
                Ok(verdict) => GradingResult::new(verdict.correct, verdict.feedback),
                Err(e) => {
                    tracing::warn!("AI grading failed for question {}: {}", question.id, e);
                    GradingResult::incorrect(FEEDBACK_GRADING_ERROR)
                }
            }
        }
    }
}

fn exact(correct: bool) -> GradingResult {
    if correct {
        GradingResult::new(true, FEEDBACK_CORRECT)
    } else {
        GradingResult::incorrect(FEEDBACK_INCORRECT)
    }
}
