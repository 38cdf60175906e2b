use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use kontakt_common::{KontaktError, Result};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
///
/// Requests use `format: "json"` so the model is constrained to emit a JSON
/// object, which is what the field matcher expects.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a new client and verify server/model availability.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| KontaktError::Config(format!("failed to create HTTP client: {e}")))?;

        let ollama_client = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        };

        ollama_client.probe_server().await?;
        ollama_client.ensure_model_available().await?;

        Ok(ollama_client)
    }

    async fn probe_server(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| unavailable(OLLAMA_CONNECTION_ERROR))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(unavailable(OLLAMA_CONNECTION_ERROR))
        }
    }

    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.fetch_available_models().await?;

        if !models.iter().any(|m| m == &self.model) {
            tracing::info!(target: "llm.ollama", model = %self.model, "model not found locally, pulling");
            self.pull_model().await?;
        }

        Ok(())
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("failed to fetch models: {e}")))?;

        if !resp.status().is_success() {
            return Ok(Vec::new());
        }

        let val: JsonValue = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("failed to parse models response: {e}")))?;

        Ok(val
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn pull_model(&self) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "stream": false }))
            .send()
            .await
            .map_err(|e| unavailable(format!("failed to pull model: {e}")))?;

        if resp.status().is_success() {
            tracing::info!(target: "llm.ollama", model = %self.model, "pulled model");
            Ok(())
        } else {
            Err(unavailable(format!(
                "failed to pull model {}: HTTP {}",
                self.model,
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);

        let mut options = serde_json::Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
            "options": options,
        });
        if let Some(sys) = system_prompt {
            payload["system"] = json!(sys);
        }

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| unavailable(format!("generate request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(unavailable(format!(
                "generate failed: HTTP {}",
                resp.status()
            )));
        }

        let val: JsonValue = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("failed to parse response: {e}")))?;

        let text = val
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or("")
            .to_string();

        let tokens_used = val
            .get("eval_count")
            .and_then(|c| c.as_u64())
            .map(|c| c as u32);

        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.probe_server().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn unavailable(msg: impl Into<String>) -> KontaktError {
    KontaktError::OracleUnavailable(msg.into())
}
