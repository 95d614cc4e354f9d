//! Generative backends: prompt in, free text out.
//!
//! Two implementations ship with the crate. `ClaudeCliBackend` pipes the
//! prompt through the `claude` CLI; `OpenAiBackend` talks to any
//! OpenAI-compatible `/chat/completions` endpoint.

use crate::config::{BackendKind, GenerationConfig};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A black-box text generator. Slow, possibly unavailable, untyped output.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the backend selected in configuration.
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerativeBackend>, GenerationError> {
    match config.backend {
        BackendKind::ClaudeCli => {
            let mut backend = ClaudeCliBackend::new().with_claude_path(config.claude_path.clone());
            if let Some(model) = &config.model {
                backend = backend.with_model(model.clone());
            }
            Ok(Arc::new(backend))
        }
        BackendKind::OpenAi => {
            let api_key = std::env::var(&config.openai_api_key_env).map_err(|_| {
                GenerationError::Backend(format!(
                    "environment variable {} is not set",
                    config.openai_api_key_env
                ))
            })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| OpenAiBackend::DEFAULT_MODEL.to_string());
            Ok(Arc::new(
                OpenAiBackend::new(api_key, model).with_base_url(config.openai_base_url.clone()),
            ))
        }
    }
}

/// Generation via the Claude CLI
pub struct ClaudeCliBackend {
    claude_path: String,
    model: Option<String>,
}

impl ClaudeCliBackend {
    /// Create a backend with the default Claude CLI path
    pub fn new() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
        }
    }

    /// Set custom Claude CLI path
    pub fn with_claude_path(mut self, path: String) -> Self {
        self.claude_path = path;
        self
    }

    /// Set Claude model to use (e.g., "sonnet", "opus")
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }
}

impl Default for ClaudeCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeBackend for ClaudeCliBackend {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut cmd = Command::new(&self.claude_path);
        cmd.arg("--print") // Non-interactive mode
            .arg("--output-format")
            .arg("json")
            .arg("--dangerously-skip-permissions");

        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        // A timed-out call drops the future; take the child down with it
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| GenerationError::Spawn {
            program: self.claude_path.clone(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| GenerationError::Backend(format!("Failed to write prompt: {}", e)))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| GenerationError::Backend(format!("Failed to close stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Backend(format!("Failed to wait for Claude CLI: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        parse_cli_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Pull the reply text out of `claude --output-format json` stdout.
fn parse_cli_output(stdout: &str) -> Result<String, GenerationError> {
    let response: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| GenerationError::Malformed(format!("Claude CLI output is not JSON: {}", e)))?;

    if response.get("is_error").and_then(|v| v.as_bool()) == Some(true) {
        let message = response
            .get("result")
            .and_then(|v| v.as_str())
            .unwrap_or("Claude CLI reported an error");
        return Err(classify_failure(message));
    }

    response
        .get("result")
        .or_else(|| response.get("text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| GenerationError::Malformed("Claude response missing 'result' field".into()))
}

fn classify_failure(message: &str) -> GenerationError {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") || lower.contains("overloaded") {
        GenerationError::RateLimited(message.trim().to_string())
    } else {
        GenerationError::Backend(message.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Generation via an OpenAI-compatible chat completions API
pub struct OpenAiBackend {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Point at a different endpoint (self-hosted or proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GenerativeBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Chat completion request failed: {}", e);
                GenerationError::Backend(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::RateLimited(error_text));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::warn!("Chat completion API error {}: {}", status, error_text);
            return Err(GenerationError::Backend(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}
