use serde::{Deserialize, Serialize};

/// Generative provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerativeProvider {
    /// Groq (OpenAI-compatible chat completions).
    Groq,
    /// Anthropic Messages API.
    Anthropic,
    /// Local Ollama instance.
    Ollama,
}

impl GenerativeProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerativeProvider::Groq => "groq",
            GenerativeProvider::Anthropic => "anthropic",
            GenerativeProvider::Ollama => "ollama",
        }
    }
}

/// Generative client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    pub provider: GenerativeProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "llama3-70b-8192".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.3
}

impl GenerativeConfig {
    /// Check that the provider can actually be reached.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("generative.model cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("generative.timeout_secs cannot be 0".to_string());
        }
        let has_key = self.api_key.as_ref().is_some_and(|k| !k.is_empty());
        if self.provider != GenerativeProvider::Ollama && !has_key && self.api_base.is_none() {
            return Err(format!(
                "generative.api_key is required for provider {}",
                self.provider.as_str()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: GenerativeConfig = toml::from_str(r#"provider = "groq""#).unwrap();
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_tokens, 2000);
        assert!((config.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result: Result<GenerativeConfig, _> = toml::from_str(r#"provider = "mystery""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_api_base_without_key() {
        let config: GenerativeConfig = toml::from_str(
            r#"
provider = "groq"
api_base = "http://proxy.local"
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }
}
