// src/models/question.rs

use serde::{Deserialize, Serialize};

pub type QuestionId = u32;

pub const DEFAULT_CODE_LANGUAGE: &str = "cpp";

/// A single stdin/expected-output pair owned by a code question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

/// One exam or quiz question. Immutable once loaded for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,

    /// The text shown to the learner.
    #[serde(rename = "question")]
    pub prompt: String,

    pub points: u32,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Kind-specific payload of a question.
/// Serialized with a `type` tag using the names the frontend already speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionKind {
    #[serde(rename = "multiple-choice", alias = "choice-single")]
    ChoiceSingle {
        options: Vec<String>,
        correct_index: usize,
    },

    /// Options are always `["True", "False"]`.
    #[serde(rename = "true-false", alias = "boolean")]
    Boolean { correct_index: usize },

    #[serde(rename = "fill-blank")]
    FillBlank { expected_answer: String },

    #[serde(rename = "code")]
    Code {
        #[serde(default)]
        test_cases: Vec<TestCase>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        starter: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::ChoiceSingle { .. } => "multiple-choice",
            QuestionKind::Boolean { .. } => "true-false",
            QuestionKind::FillBlank { .. } => "fill-blank",
            QuestionKind::Code { .. } => "code",
        }
    }
}

pub fn boolean_options() -> Vec<String> {
    vec!["True".to_string(), "False".to_string()]
}

/// DTO for sending a question to the client (excludes the answer key).
/// Code test cases stay visible, the learner sees them next to the editor.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub question_type: &'static str,
    pub question: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_cases: Option<Vec<TestCase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let mut public = PublicQuestion {
            id: q.id,
            question_type: q.kind.name(),
            question: q.prompt.clone(),
            points: q.points,
            options: None,
            test_cases: None,
            starter: None,
            language: None,
        };

        match &q.kind {
            QuestionKind::ChoiceSingle { options, .. } => public.options = Some(options.clone()),
            QuestionKind::Boolean { .. } => public.options = Some(boolean_options()),
            QuestionKind::FillBlank { .. } => {}
            QuestionKind::Code {
                test_cases,
                starter,
                language,
            } => {
                public.test_cases = Some(test_cases.clone());
                public.starter = starter.clone();
                public.language = Some(
                    language
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string()),
                );
            }
        }

        public
    }
}
