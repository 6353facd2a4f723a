// src/grading/mod.rs

//! Exam grading core: scoring, code test runs and the session lifecycle.
//! Nothing in here knows about HTTP or the database.

pub mod catalog;
pub mod prompt;
pub mod runner;
pub mod scoring;
pub mod session;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;
