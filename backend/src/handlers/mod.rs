// src/handlers/mod.rs

pub mod chat;
pub mod conversation;
pub mod exam;
pub mod grade;
pub mod health;
pub mod progress;
pub mod run;
pub mod session;
