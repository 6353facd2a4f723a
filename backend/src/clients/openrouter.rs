// src/clients/openrouter.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AiGrader, AiVerdict, ChatTutor, CollaboratorError, GradeRequest};
use crate::{
    config::AiConfig,
    grading::prompt::{TUTOR_SYSTEM_PROMPT, grading_prompt, hint_prompt},
    models::{
        chat::{ChatMessage, Role},
        grading::TestCaseResult,
    },
    utils::text::strip_code_fences,
};

const SERVICE: &str = "AI model";
const TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 300;

/// Client for an OpenAI-compatible chat completions API (OpenRouter by default).
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    completions_url: Url,
    config: AiConfig,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(http: reqwest::Client, config: AiConfig) -> Self {
        let mut completions_url = config.base_url.clone();
        completions_url
            .path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().extend(["chat", "completions"]);
            })
            .ok();

        Self {
            http,
            completions_url,
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Sends one chat completion and returns the first choice's text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: Option<u32>,
    ) -> Result<String, CollaboratorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured { service: SERVICE })?;

        tracing::debug!(model = %self.config.model, "calling chat completions");

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens,
        };

        let response = self
            .http
            .post(self.completions_url.clone())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(&body)
            .send()
            .await
            .map_err(|source| CollaboratorError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("chat completions returned {}", status);
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| CollaboratorError::Malformed {
                    service: SERVICE,
                    detail: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CollaboratorError::Empty { service: SERVICE })
    }
}

/// Parses the grader's reply, tolerating markdown fences around the JSON.
pub fn parse_verdict(text: &str) -> Result<AiVerdict, CollaboratorError> {
    serde_json::from_str(&strip_code_fences(text)).map_err(|e| CollaboratorError::Malformed {
        service: SERVICE,
        detail: e.to_string(),
    })
}

#[async_trait]
impl AiGrader for OpenRouterClient {
    async fn grade_answer(&self, request: &GradeRequest) -> Result<AiVerdict, CollaboratorError> {
        let messages = [ChatMessage::new(Role::User, grading_prompt(request))];
        let text = self.complete(&messages, None).await?;
        parse_verdict(&text)
    }

    async fn code_hint(
        &self,
        code: &str,
        failed: &[TestCaseResult],
    ) -> Result<String, CollaboratorError> {
        let messages = [ChatMessage::new(Role::User, hint_prompt(code, failed))];
        self.complete(&messages, None).await
    }

    fn hints_enabled(&self) -> bool {
        self.is_configured()
    }
}

#[async_trait]
impl ChatTutor for OpenRouterClient {
    async fn reply(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(ChatMessage::new(Role::System, TUTOR_SYSTEM_PROMPT));
        conversation.extend_from_slice(messages);
        self.complete(&conversation, Some(CHAT_MAX_TOKENS)).await
    }
}
