//! AI integration module.
//!
//! Provides text generation for workflow steps (change analysis, commit
//! messages, PR descriptions) through one of:
//!
//! - Anthropic Messages API
//! - OpenAI-compatible chat completions
//! - Ollama (local)
//!
//! The provider comes from `[ai]` in settings, or is detected from the
//! environment when nothing is configured.

mod anthropic;
mod env;
mod ollama;
mod openai;

pub use anthropic::AnthropicClient;
pub use env::{detect, detect_all, EnvAiConfig, ENV_PROVIDERS};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use std::time::Duration;

use crate::core::{AiProviderConfig, SecretStore, Settings};

/// Request timeout shared by all providers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A text generation backend.
pub trait AiClient: Send + Sync {
    /// Backend name ("anthropic", "openai", "ollama").
    fn provider(&self) -> &str;

    /// Model used for requests.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, AiError>;
}

/// AI error types.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI is not configured: {0}")]
    NotConfigured(String),

    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),

    #[error("Missing API key for {provider} (set secret '{secret}')")]
    MissingApiKey { provider: String, secret: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api { provider: String, status: u16, body: String },

    #[error("No response from {0}")]
    NoResponse(String),
}

/// Backend kinds understood by [`client_from_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Build the AI client selected by settings.
///
/// With `[ai] default` pointing at a configured provider, that provider is
/// used and the environment is not consulted. With no providers configured
/// at all, the first usable provider found in the environment is used.
pub fn client_from_settings(
    settings: &Settings,
    secrets: &SecretStore,
) -> Result<Box<dyn AiClient>, AiError> {
    if let Some((id, config)) = settings.ai.default_provider() {
        return client_from_config(id, config, secrets);
    }

    if !settings.ai.providers.is_empty() {
        return Err(AiError::NotConfigured(format!(
            "default provider '{}' is not defined under [ai.providers]",
            settings.ai.default
        )));
    }

    client_from_env()
}

/// Build a client for one configured provider.
///
/// The API key is looked up as secret `<id>_api_key`, then
/// `<provider>_api_key` (e.g. `ANTHROPIC_API_KEY`).
pub fn client_from_config(
    id: &str,
    config: &AiProviderConfig,
    secrets: &SecretStore,
) -> Result<Box<dyn AiClient>, AiError> {
    let kind = ProviderKind::parse(&config.provider)
        .ok_or_else(|| AiError::UnsupportedProvider(config.provider.clone()))?;

    let api_key = || {
        let own = format!("{id}_api_key");
        let shared = format!("{}_api_key", config.provider.to_lowercase());
        secrets
            .get(&own)
            .or_else(|| secrets.get(&shared))
            .ok_or(AiError::MissingApiKey { provider: config.provider.clone(), secret: shared })
    };

    tracing::debug!(provider = %config.provider, id, "Building AI client");

    let client: Box<dyn AiClient> = match kind {
        ProviderKind::Anthropic => {
            let mut client = AnthropicClient::new(api_key()?.expose())?;
            if let Some(model) = &config.model {
                client = client.with_model(model);
            }
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Box::new(client.with_limits(config.max_tokens, config.temperature))
        }
        ProviderKind::OpenAi => {
            let mut client = OpenAiClient::new(api_key()?.expose())?;
            if let Some(model) = &config.model {
                client = client.with_model(model);
            }
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Box::new(client.with_limits(config.max_tokens, config.temperature))
        }
        ProviderKind::Ollama => {
            let mut client = OllamaClient::new()?;
            if let Some(model) = &config.model {
                client = client.with_model(model);
            }
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Box::new(client.with_temperature(config.temperature))
        }
    };

    Ok(client)
}

/// Build a client from environment variables alone.
pub fn client_from_env() -> Result<Box<dyn AiClient>, AiError> {
    let detected = detect_all();

    for config in &detected {
        let Some(kind) = ProviderKind::parse(config.provider) else {
            continue;
        };
        let Some(api_key) = &config.api_key else {
            continue;
        };

        tracing::debug!(provider = config.provider, "Using AI provider from environment");

        let client: Box<dyn AiClient> = match kind {
            ProviderKind::Anthropic => {
                let mut client = AnthropicClient::new(api_key)?;
                if let Some(model) = &config.model {
                    client = client.with_model(model);
                }
                if let Some(url) = &config.base_url {
                    client = client.with_base_url(url);
                }
                Box::new(client)
            }
            ProviderKind::OpenAi => {
                let mut client = OpenAiClient::new(api_key)?;
                if let Some(model) = &config.model {
                    client = client.with_model(model);
                }
                if let Some(url) = &config.base_url {
                    client = client.with_base_url(url);
                }
                Box::new(client)
            }
            ProviderKind::Ollama => Box::new(OllamaClient::new()?),
        };
        return Ok(client);
    }

    let unsupported: Vec<&str> = detected
        .iter()
        .filter(|c| ProviderKind::parse(c.provider).is_none())
        .map(|c| c.provider)
        .collect();

    if unsupported.is_empty() {
        Err(AiError::NotConfigured(
            "no provider in settings and no API key in the environment".to_string(),
        ))
    } else {
        Err(AiError::NotConfigured(format!(
            "detected {} in the environment but it is not supported",
            unsupported.join(", ")
        )))
    }
}

/// Strip a surrounding markdown code fence or backticks from a model reply.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.trim_matches('`').trim().to_string();
    };
    // Drop an optional language tag on the opening fence.
    let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}

fn http_client() -> Result<reqwest::blocking::Client, AiError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(format!("titan-cli/{}", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn check_status(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(AiError::Api { provider: provider.to_string(), status: status.as_u16(), body })
}
