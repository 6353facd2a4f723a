// src/grading/session.rs

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{
    answer::{Answer, AnswerInput, AnswerStore},
    exam::ExamConfig,
    grading::{GradeReport, GradingResult},
    question::{DEFAULT_CODE_LANGUAGE, PublicQuestion, Question, QuestionId, QuestionKind, TestCase},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Exam has not been started")]
    NotStarted,
    #[error("Exam has already been started")]
    AlreadyStarted,
    #[error("Exam has already been submitted")]
    AlreadySubmitted,
    #[error("Question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),
    #[error("Question {id} is a {kind} question")]
    KindMismatch { id: QuestionId, kind: &'static str },
}

/// Everything the scoring engine needs, captured at the moment of submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub exam: Arc<ExamConfig>,
    pub answers: AnswerStore,
    pub trigger: SubmitTrigger,
    pub user_id: Option<i64>,
    pub time_taken_secs: u64,
}

/// Test cases and language of a code question about to be run.
#[derive(Debug, Clone)]
pub struct CodeTask {
    pub test_cases: Vec<TestCase>,
    pub language: String,
}

/// How long finished or abandoned sessions stay in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRetention {
    /// Time a submitted session stays available for review.
    pub review_window: Duration,
    /// Time a session may sit unstarted before it is dropped.
    pub idle_timeout: Duration,
}

impl Default for SessionRetention {
    fn default() -> Self {
        Self {
            review_window: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// Result of one timer tick.
#[derive(Debug)]
pub enum Tick {
    Running { remaining_secs: u64 },
    /// Time ran out; the session is now `Submitted` and must be graded.
    Expired(Submission),
    /// Session not in progress; the countdown should stop.
    Idle,
}

/// One learner's single attempt at an exam.
#[derive(Debug)]
pub struct ExamSession {
    id: Uuid,
    exam: Arc<ExamConfig>,
    user_id: Option<i64>,
    state: SessionState,
    answers: AnswerStore,
    flagged: BTreeSet<QuestionId>,
    remaining_secs: u64,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    trigger: Option<SubmitTrigger>,
    report: Option<GradeReport>,
    saved: Option<bool>,
    opened: Instant,
    closed: Option<Instant>,
}

impl ExamSession {
    pub fn new(exam: Arc<ExamConfig>, user_id: Option<i64>) -> Self {
        let remaining_secs = exam.duration_secs();
        Self {
            id: Uuid::new_v4(),
            exam,
            user_id,
            state: SessionState::NotStarted,
            answers: AnswerStore::new(),
            flagged: BTreeSet::new(),
            remaining_secs,
            started_at: None,
            submitted_at: None,
            trigger: None,
            report: None,
            saved: None,
            opened: Instant::now(),
            closed: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn exam(&self) -> &Arc<ExamConfig> {
        &self.exam
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn report(&self) -> Option<&GradeReport> {
        self.report.as_ref()
    }

    pub fn unanswered_count(&self) -> usize {
        self.exam
            .questions
            .iter()
            .filter(|q| !self.answers.contains(q.id))
            .count()
    }

    /// `NotStarted -> InProgress`; the full duration is put on the clock.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            SessionState::NotStarted => {
                self.state = SessionState::InProgress;
                self.remaining_secs = self.exam.duration_secs();
                self.started_at = Some(Utc::now());
                Ok(())
            }
            SessionState::InProgress => Err(LifecycleError::AlreadyStarted),
            SessionState::Submitted => Err(LifecycleError::AlreadySubmitted),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), LifecycleError> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => Err(LifecycleError::NotStarted),
            SessionState::Submitted => Err(LifecycleError::AlreadySubmitted),
        }
    }

    fn question(&self, id: QuestionId) -> Result<&Question, LifecycleError> {
        self.exam
            .question(id)
            .ok_or(LifecycleError::UnknownQuestion(id))
    }

    pub fn record_answer(
        &mut self,
        id: QuestionId,
        input: AnswerInput,
    ) -> Result<(), LifecycleError> {
        self.ensure_in_progress()?;
        let question = self.question(id)?;
        if let QuestionKind::Code { .. } = question.kind {
            // Code answers come from the runner, not from typed input.
            return Err(LifecycleError::KindMismatch {
                id,
                kind: question.kind.name(),
            });
        }
        self.answers.set(id, Answer::from(input));
        Ok(())
    }

    /// Returns what is needed to run a code question, if it may be run now.
    pub fn code_task(&self, id: QuestionId) -> Result<CodeTask, LifecycleError> {
        self.ensure_in_progress()?;
        match &self.question(id)?.kind {
            QuestionKind::Code {
                test_cases,
                language,
                ..
            } => Ok(CodeTask {
                test_cases: test_cases.clone(),
                language: language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string()),
            }),
            other => Err(LifecycleError::KindMismatch {
                id,
                kind: other.name(),
            }),
        }
    }

    /// Records that every test case passed. Sticky: later failures do not clear it.
    pub fn record_code_pass(&mut self, id: QuestionId) -> Result<(), LifecycleError> {
        self.code_task(id)?;
        self.answers.mark_code_passed(id);
        Ok(())
    }

    /// Toggles the review flag; returns whether the question is now flagged.
    pub fn toggle_flag(&mut self, id: QuestionId) -> Result<bool, LifecycleError> {
        self.ensure_in_progress()?;
        self.question(id)?;
        if self.flagged.remove(&id) {
            Ok(false)
        } else {
            self.flagged.insert(id);
            Ok(true)
        }
    }

    /// `InProgress -> Submitted`. This transition is the only guard against
    /// double submission, so it happens before any grading work.
    pub fn submit(&mut self, trigger: SubmitTrigger) -> Result<Submission, LifecycleError> {
        self.ensure_in_progress()?;
        self.state = SessionState::Submitted;
        self.trigger = Some(trigger);

        self.closed = Some(Instant::now());
        let now = Utc::now();
        self.submitted_at = Some(now);
        let time_taken_secs = self
            .started_at
            .map(|started| (now - started).num_seconds().max(0) as u64)
            .unwrap_or(0);

        Ok(Submission {
            exam: Arc::clone(&self.exam),
            answers: self.answers.clone(),
            trigger,
            user_id: self.user_id,
            time_taken_secs,
        })
    }

    /// One second elapsed. Reaching zero submits through the same path as a
    /// manual submit; ticks outside `InProgress` do nothing.
    pub fn tick(&mut self) -> Tick {
        if self.state != SessionState::InProgress {
            return Tick::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running {
                remaining_secs: self.remaining_secs,
            };
        }

        match self.submit(SubmitTrigger::Timeout) {
            Ok(submission) => Tick::Expired(submission),
            Err(_) => Tick::Idle,
        }
    }

    /// Whether the session can be dropped: unstarted past the idle timeout,
    /// or submitted longer ago than the review window. Running sessions are
    /// never stale; their countdown ends them.
    pub fn is_stale(&self, now: Instant, retention: &SessionRetention) -> bool {
        match self.state {
            SessionState::NotStarted => now.duration_since(self.opened) >= retention.idle_timeout,
            SessionState::InProgress => false,
            SessionState::Submitted => self
                .closed
                .is_some_and(|closed| now.duration_since(closed) >= retention.review_window),
        }
    }

    pub fn record_report(&mut self, report: GradeReport, saved: Option<bool>) {
        self.report = Some(report);
        self.saved = saved;
    }

    /// Read-only snapshot for the client. Per-question results are only
    /// exposed when the exam allows review.
    pub fn view(&self) -> SessionView {
        let report = self.report.as_ref().map(|r| ReportView {
            total_score: r.total_score,
            total_points: r.total_points,
            percentage: r.percentage,
            passed: r.passed,
            correct_count: r.correct_count(),
            results: self.exam.allow_review.then(|| r.clone().results),
        });

        SessionView {
            session_id: self.id,
            exam_id: self.exam.id.clone(),
            exam_title: self.exam.exam_title.clone(),
            state: self.state,
            remaining_secs: self.remaining_secs,
            answers: self.answers.clone(),
            flagged: self.flagged.iter().copied().collect(),
            unanswered: self.unanswered_count(),
            started_at: self.started_at,
            submitted_at: self.submitted_at,
            trigger: self.trigger,
            questions: self.exam.questions.iter().map(PublicQuestion::from).collect(),
            report,
            saved: self.saved,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub total_score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    pub correct_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<QuestionId, GradingResult>>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub exam_id: String,
    pub exam_title: String,
    pub state: SessionState,
    pub remaining_secs: u64,
    pub answers: AnswerStore,
    pub flagged: Vec<QuestionId>,
    pub unanswered: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub trigger: Option<SubmitTrigger>,
    pub questions: Vec<PublicQuestion>,
    /// `None` until grading has finished.
    pub report: Option<ReportView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
}
