// src/clients/mod.rs

//! Collaborator seams: the code execution sandbox and the AI model.
//! Handlers and the grading core only see these traits; the HTTP clients
//! behind them are swapped for in-process fakes in tests.

pub mod openrouter;
pub mod piston;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{chat::ChatMessage, grading::TestCaseResult};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} answered with HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an empty response")]
    Empty { service: &'static str },

    #[error("{service} returned malformed data: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },

    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
}

/// One code execution: source, language and stdin for a single test case.
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    pub language: &'a str,
    pub source_code: &'a str,
    pub stdin: &'a str,
}

/// Captured program output.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    pub stdout: String,
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionOutput, CollaboratorError>;
}

/// The triple sent to the AI grader for a free-text answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub question: String,
    pub expected_answer: String,
    pub student_answer: String,
}

/// The AI grader's verdict, parsed from its JSON reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiVerdict {
    pub correct: bool,
    pub feedback: String,
}

#[async_trait]
pub trait AiGrader: Send + Sync {
    async fn grade_answer(&self, request: &GradeRequest) -> Result<AiVerdict, CollaboratorError>;

    /// Advisory hint for code that failed some test cases.
    async fn code_hint(
        &self,
        code: &str,
        failed: &[TestCaseResult],
    ) -> Result<String, CollaboratorError>;

    /// Whether hint requests should be attempted at all.
    fn hints_enabled(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait ChatTutor: Send + Sync {
    async fn reply(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError>;
}
