use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{
    extract_json_block, CompletionRequest, CompletionResponse, GenerativeClient, GenerativeError,
};
use crate::metrics;
use crate::rate_limiter::SlidingWindowLimiter;

/// Rate-limited access to the generative capability.
///
/// Every request first passes the shared limiter. When no client is
/// configured, requests fail fast with [`GenerativeError::NotConfigured`]
/// without consuming quota.
#[derive(Clone)]
pub struct GenerativeGateway {
    limiter: Arc<SlidingWindowLimiter>,
    client: Option<Arc<dyn GenerativeClient>>,
    max_tokens: u32,
    temperature: f32,
}

impl GenerativeGateway {
    pub fn new(
        limiter: Arc<SlidingWindowLimiter>,
        client: Option<Arc<dyn GenerativeClient>>,
    ) -> Self {
        Self {
            limiter,
            client,
            max_tokens: 2000,
            temperature: 0.3,
        }
    }

    /// Gateway with no client. Every caller degrades to its fallback.
    pub fn disabled(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self::new(limiter, None)
    }

    pub fn with_generation_defaults(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    /// Start a request carrying the configured generation defaults.
    pub fn request(
        &self,
        system: impl Into<String>,
        prompt: impl Into<String>,
    ) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Admit `stage`, then run the completion.
    ///
    /// Waiting for a slot is bounded by `wait_budget`; past it the request is
    /// denied with [`GenerativeError::AdmissionDenied`].
    pub async fn generate(
        &self,
        stage: &str,
        request: CompletionRequest,
        wait_budget: Duration,
    ) -> Result<CompletionResponse, GenerativeError> {
        let Some(client) = self.client.as_ref() else {
            metrics::GENERATIVE_REQUESTS
                .with_label_values(&[stage, "not_configured"])
                .inc();
            return Err(GenerativeError::NotConfigured);
        };

        if let Err(e) = self.limiter.admit_within(stage, wait_budget).await {
            metrics::GENERATIVE_REQUESTS
                .with_label_values(&[stage, "admission_denied"])
                .inc();
            return Err(e.into());
        }

        let started = Instant::now();
        let result = client.complete(request).await;
        metrics::GENERATIVE_DURATION
            .with_label_values(&[stage])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                debug!(
                    stage = %stage,
                    model = %response.model,
                    output_tokens = response.usage.output_tokens,
                    "Completion received"
                );
                metrics::GENERATIVE_REQUESTS
                    .with_label_values(&[stage, "success"])
                    .inc();
                metrics::GENERATIVE_TOKENS
                    .with_label_values(&[client.provider(), "input"])
                    .inc_by(response.usage.input_tokens as u64);
                metrics::GENERATIVE_TOKENS
                    .with_label_values(&[client.provider(), "output"])
                    .inc_by(response.usage.output_tokens as u64);
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Completion failed");
                metrics::GENERATIVE_REQUESTS
                    .with_label_values(&[stage, e.kind()])
                    .inc();
            }
        }

        result
    }

    /// Like [`generate`](Self::generate), then parse the JSON object in the reply.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        stage: &str,
        request: CompletionRequest,
        wait_budget: Duration,
    ) -> Result<T, GenerativeError> {
        let response = self.generate(stage, request, wait_budget).await?;
        let block = extract_json_block(&response.text)?;
        serde_json::from_str(block).map_err(|e| {
            metrics::GENERATIVE_REQUESTS
                .with_label_values(&[stage, "malformed"])
                .inc();
            GenerativeError::Json(format!("{}: {}", e, block))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimitConfig;
    use crate::testing::MockGenerativeClient;
    use serde::Deserialize;

    fn limiter(capacity: u32) -> Arc<SlidingWindowLimiter> {
        Arc::new(SlidingWindowLimiter::new(&RateLimitConfig {
            capacity,
            window_ms: 60_000,
            safety_margin_ms: 100,
        }))
    }

    #[derive(Debug, Deserialize)]
    struct Reply {
        score: u32,
    }

    #[tokio::test]
    async fn test_disabled_gateway_does_not_consume_quota() {
        let limiter = limiter(5);
        let gateway = GenerativeGateway::disabled(limiter.clone());

        let err = gateway
            .generate("campaign", gateway.request("sys", "prompt"), Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerativeError::NotConfigured));
        assert_eq!(limiter.remaining().await, 5);
    }

    #[tokio::test]
    async fn test_generate_json_parses_fenced_reply() {
        let client = Arc::new(MockGenerativeClient::new());
        client.push_response("```json\n{\"score\": 77}\n```").await;
        let gateway = GenerativeGateway::new(limiter(5), Some(client.clone()));

        let reply: Reply = gateway
            .generate_json("scoring", gateway.request("sys", "score it"), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(reply.score, 77);
        assert_eq!(client.recorded_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_json_malformed_reply() {
        let client = Arc::new(MockGenerativeClient::new());
        client.push_response("{\"score\": \"high\"").await;
        let gateway = GenerativeGateway::new(limiter(5), Some(client));

        let err = gateway
            .generate_json::<Reply>("scoring", gateway.request("sys", "p"), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerativeError::Json(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_limiter_denies_within_budget() {
        let limiter = limiter(1);
        let client = Arc::new(MockGenerativeClient::new());
        client.push_response("{}").await;
        let gateway = GenerativeGateway::new(limiter, Some(client.clone()));

        gateway
            .generate("first", gateway.request("s", "p"), Duration::ZERO)
            .await
            .unwrap();
        let err = gateway
            .generate("second", gateway.request("s", "p"), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerativeError::AdmissionDenied(_)));
        assert_eq!(client.recorded_requests().await.len(), 1);
    }
}
