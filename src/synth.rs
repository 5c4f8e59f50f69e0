//! Document synthesis through a remote chat-completion endpoint.

use crate::{
    config::ModelConfig,
    error::{Error, Result},
    prompt::Prompt,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sends one prompt to a generative model and returns its text.
pub trait ModelClient {
    /// Issues a single request/response exchange.
    ///
    /// # Errors
    ///
    /// Returns an error on credential, transport or response failures.
    fn complete(&self, config: &ModelConfig, prompt: &Prompt) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking client for OpenAI-compatible `chat/completions` endpoints
/// (OpenRouter, OpenAI, LM Studio, Ollama).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCompatibleClient;

impl OpenAiCompatibleClient {
    /// Creates a new client.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ModelClient for OpenAiCompatibleClient {
    fn complete(&self, config: &ModelConfig, prompt: &Prompt) -> Result<String> {
        if config.api_key.trim().is_empty() {
            return Err(Error::synthesis("no API key configured"));
        }

        let url = config.completions_url();
        let body = ChatRequest {
            model: &config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: config.max_tokens,
            stream: false,
        };

        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let agent = builder.build();

        debug!("POST {} (model {})", url, config.model);
        let response = agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", config.api_key))
            .set("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => {
                    let text = response.into_string().unwrap_or_default();
                    let message = serde_json::from_str::<ApiError>(&text)
                        .map(|e| e.error.message)
                        .unwrap_or(text);
                    Error::synthesis(format!("model API error ({code}): {message}"))
                }
                ureq::Error::Transport(transport) => {
                    Error::synthesis(format!("request to {url} failed: {transport}"))
                }
            })?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| Error::synthesis(format!("failed to parse model response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::synthesis("model response contained no text"))
    }
}

/// Produces the README text for a prompt with exactly one model call.
pub struct Synthesizer<C> {
    client: C,
}

impl<C: ModelClient> Synthesizer<C> {
    /// Wraps a model client.
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the wrapped client.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Runs the synthesis call. The text is returned verbatim.
    ///
    /// # Errors
    ///
    /// Every failure surfaces as [`Error::Synthesis`].
    pub fn synthesize(&self, config: &ModelConfig, prompt: &Prompt) -> Result<String> {
        info!("Requesting README from {}", config.model);

        self.client.complete(config, prompt).map_err(|e| match e {
            Error::Synthesis { .. } => e,
            other => Error::synthesis(other.to_string()),
        })
    }
}
