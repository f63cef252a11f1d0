//! Mock generative client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::generative::{
    CompletionRequest, CompletionResponse, GenerativeClient, GenerativeError, TokenUsage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Scripted,
    Failing,
    Panicking,
}

/// Mock implementation of the GenerativeClient trait.
///
/// Replies are served from a queue in push order. An empty queue answers
/// with an HTTP error, so a stage that asks more often than scripted sees a
/// failure rather than a made-up reply.
///
/// # Example
///
/// ```rust,ignore
/// let client = Arc::new(MockGenerativeClient::new());
/// client.push_response(r#"{"creator_ids": ["cr-001"]}"#).await;
///
/// let gateway = GenerativeGateway::new(limiter, Some(client.clone()));
/// // ... run a stage ...
///
/// assert_eq!(client.recorded_requests().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockGenerativeClient {
    responses: Arc<RwLock<VecDeque<Result<String, GenerativeError>>>>,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
    mode: Mode,
}

impl Default for MockGenerativeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerativeClient {
    pub fn new() -> Self {
        Self::with_mode(Mode::Scripted)
    }

    /// A client whose every request fails with an HTTP error.
    pub fn failing() -> Self {
        Self::with_mode(Mode::Failing)
    }

    /// A client that panics inside `complete`.
    pub fn panicking() -> Self {
        Self::with_mode(Mode::Panicking)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            responses: Arc::new(RwLock::new(VecDeque::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            mode,
        }
    }

    /// Queue a reply text.
    pub async fn push_response(&self, text: &str) {
        self.responses.write().await.push_back(Ok(text.to_string()));
    }

    /// Queue an error.
    pub async fn push_error(&self, error: GenerativeError) {
        self.responses.write().await.push_back(Err(error));
    }

    /// Every request received, in order.
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }

    pub async fn pending_responses(&self) -> usize {
        self.responses.read().await.len()
    }
}

#[async_trait]
impl GenerativeClient for MockGenerativeClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GenerativeError> {
        self.requests.write().await.push(request);

        match self.mode {
            Mode::Failing => return Err(GenerativeError::Http("mock failure".to_string())),
            Mode::Panicking => panic!("mock generative client panicked"),
            Mode::Scripted => {}
        }

        let next = self.responses.write().await.pop_front();
        match next {
            Some(Ok(text)) => Ok(CompletionResponse {
                text,
                usage: TokenUsage::default(),
                model: "mock-model".to_string(),
            }),
            Some(Err(e)) => Err(e),
            None => Err(GenerativeError::Http("no scripted response".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_are_served_in_order() {
        let client = MockGenerativeClient::new();
        client.push_response("first").await;
        client.push_error(GenerativeError::Json("bad".into())).await;

        let first = client.complete(CompletionRequest::new("a")).await.unwrap();
        assert_eq!(first.text, "first");
        assert!(matches!(
            client.complete(CompletionRequest::new("b")).await,
            Err(GenerativeError::Json(_))
        ));
        assert!(matches!(
            client.complete(CompletionRequest::new("c")).await,
            Err(GenerativeError::Http(_))
        ));
        assert_eq!(client.recorded_requests().await.len(), 3);
    }
}
