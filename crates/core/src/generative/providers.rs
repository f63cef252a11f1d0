//! Provider clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{
    CompletionRequest, CompletionResponse, GenerativeClient, GenerativeConfig, GenerativeError,
    GenerativeProvider, TokenUsage,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> GenerativeError {
    if err.is_timeout() {
        GenerativeError::Timeout(timeout)
    } else {
        GenerativeError::Http(err.to_string())
    }
}

/// Build the configured provider client.
///
/// Returns `None` when the configuration lacks what the provider needs, so
/// the caller runs with fallbacks only.
pub fn create_generative_client(config: &GenerativeConfig) -> Option<Arc<dyn GenerativeClient>> {
    let timeout = Duration::from_secs(config.timeout_secs as u64);
    let api_key = config.api_key.clone().filter(|k| !k.is_empty());

    let client: Arc<dyn GenerativeClient> = match config.provider {
        GenerativeProvider::Groq => {
            if api_key.is_none() && config.api_base.is_none() {
                warn!("Groq provider configured but no API key provided");
                return None;
            }
            let api_key = api_key.unwrap_or_default();
            let mut client =
                ChatCompletionsClient::new(api_key, config.model.clone()).with_timeout(timeout);
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Arc::new(client)
        }
        GenerativeProvider::Anthropic => {
            if api_key.is_none() && config.api_base.is_none() {
                warn!("Anthropic provider configured but no API key provided");
                return None;
            }
            let api_key = api_key.unwrap_or_default();
            let mut client =
                AnthropicClient::new(api_key, config.model.clone()).with_timeout(timeout);
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Arc::new(client)
        }
        GenerativeProvider::Ollama => {
            let mut client = OllamaClient::new(config.model.clone()).with_timeout(timeout);
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Arc::new(client)
        }
    };

    info!(
        provider = config.provider.as_str(),
        model = %config.model,
        "Generative capability enabled"
    );
    Some(client)
}

// ============================================================================
// OpenAI-compatible chat completions (Groq)
// ============================================================================

/// Client for OpenAI-compatible `/v1/chat/completions` endpoints.
///
/// Defaults to Groq's hosted endpoint.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.groq.com/openai".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: String,
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
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

#[async_trait]
impl GenerativeClient for ChatCompletionsClient {
    fn provider(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GenerativeError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
        });

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .header("content-type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GenerativeError::Api { status, message });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerativeError::Json(e.to_string()))?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerativeError::Json("response has no choices".to_string()))?;

        let usage = chat_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            usage,
            model: if chat_response.model.is_empty() {
                self.model.clone()
            } else {
                chat_response.model
            },
        })
    }
}

// ============================================================================
// Anthropic
// ============================================================================

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.anthropic.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl GenerativeClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GenerativeError> {
        let anthropic_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GenerativeError::Api { status, message });
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GenerativeError::Json(e.to_string()))?;

        let text = anthropic_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            text,
            usage: TokenUsage {
                input_tokens: anthropic_response.usage.input_tokens,
                output_tokens: anthropic_response.usage.output_tokens,
            },
            model: anthropic_response.model,
        })
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama client for local inference. No API key required.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            model: model.into(),
            api_base: "http://localhost:11434".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    eval_count: u32,
    #[serde(default)]
    prompt_eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

#[async_trait]
impl GenerativeClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GenerativeError> {
        let ollama_request = OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_base))
            .header("content-type", "application/json")
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(GenerativeError::Api { status, message });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerativeError::Json(e.to_string()))?;

        Ok(CompletionResponse {
            text: ollama_response.response,
            usage: TokenUsage {
                input_tokens: ollama_response.prompt_eval_count,
                output_tokens: ollama_response.eval_count,
            },
            model: ollama_response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: GenerativeProvider, api_key: Option<&str>) -> GenerativeConfig {
        GenerativeConfig {
            provider,
            model: "test-model".to_string(),
            api_key: api_key.map(String::from),
            api_base: None,
            timeout_secs: 5,
            max_tokens: 100,
            temperature: 0.3,
        }
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_generative_client(&config(GenerativeProvider::Groq, Some("gsk")))
            .unwrap();
        assert_eq!(client.provider(), "groq");
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn test_create_client_without_key_is_none() {
        assert!(create_generative_client(&config(GenerativeProvider::Anthropic, None)).is_none());
        assert!(create_generative_client(&config(GenerativeProvider::Groq, Some(""))).is_none());
    }

    #[test]
    fn test_create_ollama_client_without_key() {
        let client = create_generative_client(&config(GenerativeProvider::Ollama, None)).unwrap();
        assert_eq!(client.provider(), "ollama");
    }

    #[test]
    fn test_chat_client_custom_base_trims_slash() {
        let client = ChatCompletionsClient::new("key", "m").with_api_base("http://proxy.local/");
        assert_eq!(client.api_base, "http://proxy.local");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "Be concise".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: "Hello".to_string(),
                },
            ],
            max_tokens: 100,
            temperature: 0.5,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"llama3-70b-8192\""));
        assert!(json.contains("\"role\":\"system\""));
        assert!(json.contains("\"max_tokens\":100"));
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{
            "model": "llama3-70b-8192",
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.usage.unwrap().completion_tokens, 4);
    }
}
