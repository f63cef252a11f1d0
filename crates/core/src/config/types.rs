use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::calls::CallsConfig;
use crate::generative::{GenerativeConfig, GenerativeProvider};
use crate::pipeline::PipelineConfig;
use crate::rate_limiter::RateLimitConfig;
use crate::telephony::TelephonyConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Hosted text generation. When absent every stage runs its fallback.
    #[serde(default)]
    pub generative: Option<GenerativeConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub calls: CallsConfig,
    #[serde(default)]
    pub telephony: Option<TelephonyConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("creatorflow.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generative: Option<SanitizedGenerativeConfig>,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
    pub calls: CallsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephony: Option<SanitizedTelephonyConfig>,
}

/// Sanitized generative config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGenerativeConfig {
    pub provider: GenerativeProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

/// Sanitized telephony config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelephonyConfig {
    pub api_base: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            generative: config
                .generative
                .as_ref()
                .map(|g| SanitizedGenerativeConfig {
                    provider: g.provider,
                    model: g.model.clone(),
                    api_base: g.api_base.clone(),
                    api_key_configured: g.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                    timeout_secs: g.timeout_secs,
                }),
            rate_limit: config.rate_limit.clone(),
            pipeline: config.pipeline.clone(),
            calls: config.calls.clone(),
            telephony: config.telephony.as_ref().map(|t| SanitizedTelephonyConfig {
                api_base: t.api_base.clone(),
                api_key_configured: !t.api_key.is_empty(),
                timeout_secs: t.timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "creatorflow.db");
        assert_eq!(config.rate_limit.capacity, 5);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.calls.max_polling_attempts, 24);
        assert_eq!(config.calls.poll_interval_ms, 5_000);
        assert!(config.generative.is_none());
        assert!(config.telephony.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[generative]
provider = "groq"
model = "llama3-70b-8192"
api_key = "gsk-test"

[rate_limit]
capacity = 10
window_ms = 30000

[pipeline]
outreach_top_n = 5

[calls]
poll_interval_ms = 2000

[telephony]
api_base = "http://localhost:7000"
api_key = "tel-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.rate_limit.capacity, 10);
        assert_eq!(config.rate_limit.safety_margin_ms, 100);
        assert_eq!(config.pipeline.outreach_top_n, 5);
        assert_eq!(config.pipeline.scoring_ai_budget, 1);
        assert_eq!(config.calls.poll_interval_ms, 2000);
        assert_eq!(config.calls.max_polling_attempts, 24);

        let generative = config.generative.unwrap();
        assert_eq!(generative.provider, GenerativeProvider::Groq);
        assert_eq!(generative.model, "llama3-70b-8192");
        assert_eq!(config.telephony.unwrap().timeout_secs, 30);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[generative]
provider = "anthropic"
model = "claude-3-haiku-20240307"
api_key = "sk-secret"

[telephony]
api_base = "http://localhost:7000"
api_key = "tel-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        let generative = sanitized.generative.as_ref().unwrap();
        assert!(generative.api_key_configured);
        assert!(sanitized.telephony.as_ref().unwrap().api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("tel-secret"));
    }
}
