//! Detection of AI settings from environment variables.
//!
//! Corporate gateways are usually configured through `*_BASE_URL` and
//! `*_DEFAULT_MODEL` variables next to the API key.

/// Variables checked per provider, in priority order.
struct EnvPattern {
    provider: &'static str,
    api_key: &'static [&'static str],
    base_url: &'static [&'static str],
    model: &'static [&'static str],
}

const PATTERNS: &[EnvPattern] = &[
    EnvPattern {
        provider: "anthropic",
        api_key: &["ANTHROPIC_API_KEY"],
        base_url: &["ANTHROPIC_BASE_URL"],
        model: &["ANTHROPIC_DEFAULT_MODEL", "ANTHROPIC_DEFAULT_SONNET_MODEL", "ANTHROPIC_MODEL"],
    },
    EnvPattern {
        provider: "openai",
        api_key: &["OPENAI_API_KEY"],
        base_url: &["OPENAI_BASE_URL", "OPENAI_API_BASE"],
        model: &["OPENAI_DEFAULT_MODEL", "OPENAI_MODEL"],
    },
    EnvPattern {
        provider: "gemini",
        api_key: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        base_url: &["GEMINI_BASE_URL"],
        model: &["GEMINI_DEFAULT_MODEL", "GEMINI_MODEL"],
    },
];

/// Providers with known environment variables, in detection order.
pub const ENV_PROVIDERS: &[&str] = &["anthropic", "openai", "gemini"];

/// AI settings found in the environment for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvAiConfig {
    pub provider: &'static str,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for EnvAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvAiConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Detect settings for one provider. Returns `None` when no variable for it
/// is set.
pub fn detect(provider: &str) -> Option<EnvAiConfig> {
    let pattern = PATTERNS.iter().find(|p| p.provider == provider)?;

    let config = EnvAiConfig {
        provider: pattern.provider,
        api_key: first_set(pattern.api_key),
        base_url: first_set(pattern.base_url),
        model: first_set(pattern.model),
    };

    if config.api_key.is_none() && config.base_url.is_none() && config.model.is_none() {
        return None;
    }
    Some(config)
}

/// Detect settings for every known provider.
pub fn detect_all() -> Vec<EnvAiConfig> {
    ENV_PROVIDERS.iter().filter_map(|p| detect(p)).collect()
}

fn first_set(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}
