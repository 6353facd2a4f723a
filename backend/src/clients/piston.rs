// src/clients/piston.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CodeExecutor, CollaboratorError, ExecutionOutput, ExecutionRequest};

const SERVICE: &str = "code execution";

/// Client for a Piston v2 execution service.
#[derive(Debug, Clone)]
pub struct PistonClient {
    http: reqwest::Client,
    execute_url: Url,
    cpp_version: String,
}

#[derive(Debug, Serialize)]
struct PistonFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    stdin: &'a str,
}

#[derive(Debug, Deserialize)]
struct PistonResponse {
    run: Option<PistonStage>,
}

#[derive(Debug, Deserialize)]
struct PistonStage {
    #[serde(default)]
    output: Option<String>,
}

impl PistonClient {
    pub fn new(http: reqwest::Client, base_url: &Url, cpp_version: impl Into<String>) -> Self {
        let mut execute_url = base_url.clone();
        execute_url
            .path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().push("execute");
            })
            .ok();

        Self {
            http,
            execute_url,
            cpp_version: cpp_version.into(),
        }
    }

    /// Runtime version sent with a request. C++ is pinned, everything else
    /// takes whatever the service has installed.
    fn version_for(&self, language: &str) -> &str {
        match language {
            "cpp" | "c++" => &self.cpp_version,
            _ => "*",
        }
    }
}

fn file_name_for(language: &str) -> &'static str {
    match language {
        "cpp" | "c++" => "main.cpp",
        "c" => "main.c",
        "python" | "python3" => "main.py",
        "java" => "Main.java",
        "rust" => "main.rs",
        "javascript" | "js" => "main.js",
        _ => "main",
    }
}

#[async_trait]
impl CodeExecutor for PistonClient {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionOutput, CollaboratorError> {
        let body = PistonRequest {
            language: request.language,
            version: self.version_for(request.language),
            files: vec![PistonFile {
                name: file_name_for(request.language),
                content: request.source_code,
            }],
            stdin: request.stdin,
        };

        let response = self
            .http
            .post(self.execute_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|source| CollaboratorError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Piston returned {} for language {}", status, request.language);
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let parsed: PistonResponse =
            response
                .json()
                .await
                .map_err(|e| CollaboratorError::Malformed {
                    service: SERVICE,
                    detail: e.to_string(),
                })?;

        // A missing run stage (e.g. compile failure) is treated as empty output.
        let stdout = parsed.run.and_then(|run| run.output).unwrap_or_default();

        Ok(ExecutionOutput { stdout })
    }
}
