// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

use crate::grading::session::SessionRetention;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://edu.db?mode=rwc";
pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must be a whole number of minutes, got {value:?}")]
    InvalidMinutes { name: &'static str, value: String },
}

/// Settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub model: String,
    pub site_url: String,
    pub site_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub server_addr: String,
    pub exam_dir: String,
    pub cors_origins: Vec<String>,
    pub piston_url: Url,
    pub piston_cpp_version: String,
    pub ai: AiConfig,
    pub session_retention: SessionRetention,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let piston_url = parse_url("PISTON_URL", &or("PISTON_URL", DEFAULT_PISTON_URL))?;
        let ai_base = parse_url(
            "OPENROUTER_BASE_URL",
            &or("OPENROUTER_BASE_URL", DEFAULT_OPENROUTER_URL),
        )?;

        let defaults = SessionRetention::default();
        let session_retention = SessionRetention {
            review_window: minutes("SESSION_REVIEW_MINUTES", get("SESSION_REVIEW_MINUTES"))?
                .unwrap_or(defaults.review_window),
            idle_timeout: minutes("SESSION_IDLE_MINUTES", get("SESSION_IDLE_MINUTES"))?
                .unwrap_or(defaults.idle_timeout),
        };

        let cors_origins = or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: or("DATABASE_URL", DEFAULT_DATABASE_URL),
            rust_log: or("RUST_LOG", "info"),
            server_addr: or("SERVER_ADDR", "0.0.0.0:8000"),
            exam_dir: or("EXAM_DIR", "data/exams"),
            cors_origins,
            piston_url,
            piston_cpp_version: or("PISTON_CPP_VERSION", "10.2.0"),
            ai: AiConfig {
                api_key: get("OPENROUTER_API_KEY"),
                base_url: ai_base,
                model: or("OPENROUTER_MODEL", DEFAULT_MODEL),
                site_url: get("OPENROUTER_SITE_URL").unwrap_or_default(),
                site_name: or("OPENROUTER_SITE_NAME", "Edu-Chatbot"),
            },
            session_retention,
        })
    }
}

fn minutes(name: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| ConfigError::InvalidMinutes { name, value: v })
        })
        .transpose()
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}
