//! Ollama local LLM client.

use serde::{Deserialize, Serialize};

use super::{check_status, http_client, AiClient, AiError};

/// Ollama `/api/generate` client. No API key is needed.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Uses `OLLAMA_HOST` and `OLLAMA_MODEL` when set, else localhost:11434.
    pub fn new() -> Result<Self, AiError> {
        Ok(Self {
            client: http_client()?,
            base_url: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            temperature: 0.7,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl AiClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, AiError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: Options { temperature: self.temperature },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()?;

        let response: GenerateResponse = check_status(self.provider(), response)?.json()?;
        if response.response.trim().is_empty() {
            return Err(AiError::NoResponse(self.provider().to_string()));
        }
        Ok(response.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
