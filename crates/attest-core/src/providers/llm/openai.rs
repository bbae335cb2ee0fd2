use super::{Completion, CompletionClient, CompletionError};
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAiClient {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": max_output_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CompletionError::Api {
                status: status.as_u16(),
                message: "response missing message content".to_string(),
            })?
            .to_string();

        // Some gateways omit usage; fall back to a rough estimate so run
        // accounting stays populated.
        let tokens_used = payload
            .pointer("/usage/total_tokens")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or_else(|| (text.len() / 4) as u32);

        Ok(Completion { text, tokens_used })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
