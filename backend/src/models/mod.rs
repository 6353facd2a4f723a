// src/models/mod.rs

pub mod answer;
pub mod chat;
pub mod conversation;
pub mod exam;
pub mod grading;
pub mod progress;
pub mod question;
