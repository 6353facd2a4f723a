// src/models/answer.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::models::question::QuestionId;

/// Sentinel stored for a code question whose tests all passed.
pub const CODE_PASSED: &str = "passed";

/// The learner's current answer to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Selected option index (choice and true/false questions).
    Choice(usize),
    /// Typed text (fill-in-the-blank).
    Text(String),
    /// Recorded by the code runner only, never by learner input.
    CodePassed,
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Answer::Choice(index) => serializer.serialize_u64(*index as u64),
            Answer::Text(text) => serializer.serialize_str(text),
            Answer::CodePassed => serializer.serialize_str(CODE_PASSED),
        }
    }
}

/// Answer payload accepted from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Choice(usize),
    Text(String),
}

impl From<AnswerInput> for Answer {
    fn from(input: AnswerInput) -> Self {
        match input {
            AnswerInput::Choice(index) => Answer::Choice(index),
            AnswerInput::Text(text) => Answer::Text(text),
        }
    }
}

/// In-memory mapping from question id to the learner's current answer.
/// Entries are only ever inserted or replaced for the life of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerStore {
    answers: BTreeMap<QuestionId, Answer>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: QuestionId, answer: Answer) {
        self.answers.insert(id, answer);
    }

    pub fn get(&self, id: QuestionId) -> Option<&Answer> {
        self.answers.get(&id)
    }

    pub fn mark_code_passed(&mut self, id: QuestionId) {
        self.answers.insert(id, Answer::CodePassed);
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl FromIterator<(QuestionId, Answer)> for AnswerStore {
    fn from_iter<I: IntoIterator<Item = (QuestionId, Answer)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}
