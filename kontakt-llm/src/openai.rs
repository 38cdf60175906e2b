use crate::traits::{LlmClient, LlmResponse};
use crate::DEFAULT_OPENAI_ENDPOINT;
use async_trait::async_trait;
use kontakt_common::{KontaktError, Result};
use kontakt_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for OpenAI-compatible `chat/completions` endpoints.
///
/// JSON mode (`response_format: json_object`) is on by default because every
/// caller in this workspace expects a single JSON object back.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    json_mode: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a new client against the public OpenAI endpoint.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_endpoint(api_key, model, DEFAULT_OPENAI_ENDPOINT)
    }

    /// Create a client for an OpenAI-compatible gateway, e.g. `http://localhost:8080/v1`.
    pub fn with_endpoint(api_key: String, model: String, endpoint: &str) -> Result<Self> {
        let base = format!("{}/", endpoint.trim_end_matches('/'));
        let client = HttpClient::new(&base)
            .map_err(|e| KontaktError::Config(format!("invalid OpenAI endpoint: {e}")))?
            .with_timeout(Duration::from_secs(60));

        Ok(Self {
            client,
            api_key,
            model,
            json_mode: true,
        })
    }

    /// Toggle `response_format: json_object`; some compatible servers reject it.
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            response_format: self.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            target: "llm.openai",
            model = %self.model,
            prompt_chars = prompt.len(),
            json_mode = self.json_mode,
            "chat completion request"
        );

        let resp: ChatResponse = self
            .client
            .post_json("chat/completions", Some(&self.api_key), &req)
            .await
            .map_err(http_to_kontakt)?;

        let text = resp
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .unwrap_or_default();

        Ok(LlmResponse {
            text,
            model: resp.model.or_else(|| Some(self.model.clone())),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .generate("Reply with {\"ok\":true}", None, Some(8), Some(0.0))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(target: "llm.openai", error = %e, "health check failed");
                Ok(false)
            }
        }
    }
}

fn http_to_kontakt(e: HttpError) -> KontaktError {
    KontaktError::OracleUnavailable(e.to_string())
}
