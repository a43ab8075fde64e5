//! OpenAI-compatible generation backend
//!
//! Implements both generation seams of `research-core` on top of a
//! chat-completions endpoint:
//! - Structured calls request `response_format = json_schema`
//! - Text calls return the assistant message verbatim
//!
//! The persona goes in the system message. Tool groups are not forwarded;
//! any retrieval happens on the provider side.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use async_trait::async_trait;
use research_core::{
    BackendSettings, GenerationError, GenerationOptions, StructuredGenerator, TargetSchema,
    TextGenerator,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Connection settings for [`OpenAiBackend`]
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL, without trailing `/chat/completions`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model used when the call does not request one
    pub default_model: String,
}

impl OpenAiConfig {
    /// Create config
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        }
    }

    /// Build from backend settings, reading the key from the configured variable
    ///
    /// # Errors
    /// Message naming the missing environment variable
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, String> {
        let api_key = std::env::var(&settings.api_key_env)
            .map_err(|_| format!("environment variable {} is not set", settings.api_key_env))?;
        Ok(Self::new(&settings.base_url, api_key, &settings.model))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions generation backend
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    config: OpenAiConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    /// Create backend with a fresh HTTP client
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// With caller-supplied HTTP client
    #[inline]
    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Backend configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        response_format: Option<Value>,
    ) -> Result<Option<String>, GenerationError> {
        let persona = options.persona.as_ref().map(research_core::Persona::render);
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = persona.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let model = options.model.as_deref().unwrap_or(&self.config.default_model);
        if !options.tool_groups.is_empty() {
            tracing::debug!(tools = ?options.tool_groups, "Tool groups are left to the provider");
        }

        let request = ChatRequest {
            model,
            messages,
            temperature: options.temperature,
            response_format,
        };

        tracing::debug!(model, prompt_len = prompt.len(), "Sending chat completion");
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Chat completion failed");
            return Err(GenerationError::Backend(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(format!("unreadable response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiBackend {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &TargetSchema,
        options: &GenerationOptions,
    ) -> Result<Value, GenerationError> {
        let format = json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema.name,
                "schema": schema.schema,
            }
        });

        let content = self
            .complete(prompt, options, Some(format))
            .await?
            .ok_or_else(|| GenerationError::Schema("response has no content".to_string()))?;

        serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| GenerationError::Schema(format!("content is not JSON: {e}")))
    }
}

#[async_trait]
impl TextGenerator for OpenAiBackend {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        Ok(self.complete(prompt, options, None).await?.unwrap_or_default())
    }
}

/// Remove a surrounding markdown code fence, if any
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n[]\n```  "), "[]");
    }

    #[test]
    fn strips_single_line_fences() {
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json {\"a\":1} ```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```[1, 2]```"), "[1, 2]");
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let config = OpenAiConfig::new("http://localhost:9/v1/", "k", "m");
        assert_eq!(config.completions_url(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn from_settings_requires_key() {
        let settings = BackendSettings {
            api_key_env: "RESEARCH_OPENAI_TEST_UNSET_KEY".to_string(),
            ..BackendSettings::default()
        };
        let err = OpenAiConfig::from_settings(&settings).unwrap_err();
        assert!(err.contains("RESEARCH_OPENAI_TEST_UNSET_KEY"));
    }
}
