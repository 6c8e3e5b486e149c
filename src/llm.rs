use crate::config::CopilotConfig;
use crate::error::{CopilotError, Result};
use crate::sql::strip_code_fences;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const SQL_SYSTEM_PROMPT: &str =
    "You generate Postgres SQL only. Never include explanations, markdown, or code fences.";
const JSON_SYSTEM_PROMPT: &str =
    "You are a precise JSON-only responder. Always return valid JSON, no other text.";
const TEXT_SYSTEM_PROMPT: &str =
    "You are a careful data analyst. You must only use the provided data and must not make up facts.";

/// Untrusted, non-deterministic text generator. Whatever it returns is only
/// ever handed to the SQL validator or shown as prose.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// SQL text with any code fences stripped.
    async fn generate_sql(&self, prompt: &str) -> Result<String>;

    /// Raw text expected to hold a JSON document.
    async fn generate_json(&self, prompt: &str) -> Result<String>;

    /// Free prose (summaries).
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions client.
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_config(config: &CopilotConfig) -> Result<Self> {
        Ok(Self::new(
            config.require_api_key()?.to_string(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        ))
    }

    async fn call_llm(&self, system: &str, prompt: &str, temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CopilotError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CopilotError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        if !status.is_success() {
            let message = response_json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(CopilotError::Llm(format!("LLM API returned {}: {}", status, message)));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CopilotError::Llm("No content in LLM response".to_string()))?;

        debug!("LLM response ({} chars)", content.len());
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate_sql(&self, prompt: &str) -> Result<String> {
        let text = self.call_llm(SQL_SYSTEM_PROMPT, prompt, 0.2).await?;
        Ok(strip_code_fences(&text))
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.call_llm(JSON_SYSTEM_PROMPT, prompt, 0.4).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.call_llm(TEXT_SYSTEM_PROMPT, prompt, 0.3).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_key() {
        let config = CopilotConfig::default();
        assert!(matches!(LlmClient::from_config(&config), Err(CopilotError::Config(_))));
    }

    #[test]
    fn test_base_url_normalized() {
        let client = LlmClient::new("k".to_string(), "http://localhost:8080/v1/".to_string(), "m".to_string());
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
