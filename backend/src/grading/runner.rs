// src/grading/runner.rs

use crate::{
    clients::{AiGrader, CodeExecutor, CollaboratorError, ExecutionRequest},
    models::{
        grading::{RunReport, TestCaseResult},
        question::TestCase,
    },
    utils::text::outputs_match,
};

/// Runs `code` once per test case, in order.
///
/// The first collaborator failure aborts the whole run: no retry, and the
/// remaining cases are not attempted.
pub async fn run_tests(
    executor: &dyn CodeExecutor,
    language: &str,
    code: &str,
    test_cases: &[TestCase],
) -> Result<Vec<TestCaseResult>, CollaboratorError> {
    let mut results = Vec::with_capacity(test_cases.len());

    for case in test_cases {
        let output = executor
            .execute(ExecutionRequest {
                language,
                source_code: code,
                stdin: &case.input,
            })
            .await?;

        let output = output.stdout.trim().to_string();
        let passed = outputs_match(&output, &case.expected);
        results.push(TestCaseResult {
            input: case.input.clone(),
            expected: case.expected.clone(),
            output,
            passed,
        });
    }

    Ok(results)
}

/// Runs the tests and, when some failed, asks the AI for an advisory hint.
/// A hint failure just means no hint.
pub async fn evaluate_code(
    executor: &dyn CodeExecutor,
    grader: &dyn AiGrader,
    language: &str,
    code: &str,
    test_cases: &[TestCase],
) -> Result<RunReport, CollaboratorError> {
    let results = run_tests(executor, language, code, test_cases).await?;
    let all_passed = results.iter().all(|r| r.passed);

    let mut ai_hint = None;
    if !all_passed && grader.hints_enabled() {
        let failed: Vec<TestCaseResult> = results.iter().filter(|r| !r.passed).cloned().collect();
        match grader.code_hint(code, &failed).await {
            Ok(hint) => ai_hint = Some(hint),
            Err(e) => tracing::warn!("Hint request failed: {}", e),
        }
    }

    Ok(RunReport {
        results,
        all_passed,
        ai_hint,
    })
}
