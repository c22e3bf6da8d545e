//! Reply text generation through the OpenAI chat-completions API.
//!
//! The generator is treated as unreliable: every failure is logged and turned
//! into `None`, which the orchestrator answers with a fallback reply.

use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::config::{BoxError, OpenAiConfig};
use crate::orchestrator::ReplyGenerator;
use crate::twitter::sanitize_for_logging;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// [`ReplyGenerator`] backed by OpenAI chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Self {
        OpenAiGenerator {
            config,
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    async fn chat(&self, prompt: &str, system_instructions: &str) -> Result<Option<String>, BoxError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: 200,
            temperature: 0.8,
            presence_penalty: 0.5,
            frequency_penalty: 0.5,
        };

        debug!("OpenAI chat request with model {}", self.config.model);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "OpenAI error {}: {}",
                status,
                sanitize_for_logging(&error_text, 200)
            );
            return Ok(None);
        }

        let body: ChatResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, system_instructions: &str) -> Option<String> {
        match self.chat(prompt, system_instructions).await {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!("OpenAI returned no reply text");
                None
            }
            Err(e) => {
                error!("Error calling OpenAI: {}", e);
                None
            }
        }
    }
}

/// Generator that never produces text, so every reply comes from the fallback pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackOnlyGenerator;

#[async_trait]
impl ReplyGenerator for FallbackOnlyGenerator {
    async fn generate(&self, _prompt: &str, _system_instructions: &str) -> Option<String> {
        None
    }
}
