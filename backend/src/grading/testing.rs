// src/grading/testing.rs

//! In-process collaborator fakes for unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    clients::{
        AiGrader, AiVerdict, CodeExecutor, CollaboratorError, ExecutionOutput, ExecutionRequest,
        GradeRequest,
    },
    models::{
        grading::TestCaseResult,
        question::{Question, QuestionId, QuestionKind},
    },
};

pub fn question(id: QuestionId, points: u32, kind: QuestionKind) -> Question {
    Question {
        id,
        prompt: format!("Question {id}"),
        points,
        kind,
    }
}

enum Mode {
    Verdict(bool),
    Fail,
}

/// Grader returning a fixed verdict (or failing) and recording every request.
pub struct ScriptedGrader {
    mode: Mode,
    hint: Option<String>,
    calls: AtomicUsize,
    hint_calls: AtomicUsize,
    requests: Mutex<Vec<GradeRequest>>,
}

impl ScriptedGrader {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            hint: Some("Nice try, but what does n % 2 give?".into()),
            calls: AtomicUsize::new(0),
            hint_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn correct() -> Self {
        Self::with_mode(Mode::Verdict(true))
    }

    pub fn incorrect() -> Self {
        Self::with_mode(Mode::Verdict(false))
    }

    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    pub fn without_hints(mut self) -> Self {
        self.hint = None;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn hint_calls(&self) -> usize {
        self.hint_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GradeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGrader for ScriptedGrader {
    async fn grade_answer(&self, request: &GradeRequest) -> Result<AiVerdict, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match self.mode {
            Mode::Verdict(true) => Ok(AiVerdict {
                correct: true,
                feedback: "Great job!".into(),
            }),
            Mode::Verdict(false) => Ok(AiVerdict {
                correct: false,
                feedback: "Nice try, but...".into(),
            }),
            Mode::Fail => Err(CollaboratorError::Malformed {
                service: "AI model",
                detail: "not json".into(),
            }),
        }
    }

    async fn code_hint(
        &self,
        _code: &str,
        _failed: &[TestCaseResult],
    ) -> Result<String, CollaboratorError> {
        self.hint_calls.fetch_add(1, Ordering::SeqCst);
        match (&self.mode, &self.hint) {
            (Mode::Fail, _) => Err(CollaboratorError::Empty { service: "AI model" }),
            (_, Some(hint)) => Ok(hint.clone()),
            (_, None) => Err(CollaboratorError::Empty { service: "AI model" }),
        }
    }

    fn hints_enabled(&self) -> bool {
        self.hint.is_some()
    }
}

/// Executor answering from a stdin -> output table; unknown stdin is a transport-style failure.
pub struct TableExecutor {
    outputs: HashMap<String, String>,
    calls: AtomicUsize,
}

impl TableExecutor {
    pub fn new<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self {
            outputs: pairs
                .into_iter()
                .map(|(i, o)| (i.to_string(), o.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeExecutor for TableExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionOutput, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outputs
            .get(request.stdin)
            .map(|stdout| ExecutionOutput {
                stdout: stdout.clone(),
            })
            .ok_or(CollaboratorError::Status {
                service: "code execution",
                status: 502,
            })
    }
}
