//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing without a hosted
//! model or a telephony account.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use creatorflow_core::{
    testing::{MockGenerativeClient, MockTelephony},
    CallLifecycleManager, CampaignWorkflow, Config, ConversationStore, CreatorPool,
    DatabaseConfig, GenerativeGateway, SqliteConversationStore,
};
use creatorflow_server::{api::WsBroadcaster, state::AppState};

/// Re-export fixtures for test convenience
pub use creatorflow_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Text generation (MockGenerativeClient, only when enabled)
/// - Call placement and artifacts (MockTelephony)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_workflow() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/workflow", json!({
///         "company_name": "Glow Naturals"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock generative client - script replies
    pub generative: Arc<MockGenerativeClient>,
    /// Mock telephony - script call statuses and artifacts
    pub telephony: Arc<MockTelephony>,
    /// Conversation store shared with the server
    pub conversations: Arc<SqliteConversationStore>,
    /// Call manager shared with the server
    pub calls: CallLifecycleManager,
    /// WebSocket relay fed by the call manager
    pub ws: WsBroadcaster,
    /// Temporary directory for test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with no generative provider.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let generative = Arc::new(MockGenerativeClient::new());
        let telephony = Arc::new(MockTelephony::new());

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let conversations = Arc::new(
            SqliteConversationStore::new(&db_path).expect("Failed to create conversation store"),
        );
        let store: Arc<dyn ConversationStore> = conversations.clone();

        let gateway: GenerativeGateway = if test_config.enable_generative {
            fixtures::gateway(generative.clone())
        } else {
            fixtures::disabled_gateway()
        };

        let workflow = CampaignWorkflow::new(
            gateway.clone(),
            Arc::new(CreatorPool::builtin()),
            Arc::clone(&store),
            &config.pipeline,
        );
        let calls = CallLifecycleManager::new(
            telephony.clone(),
            Arc::clone(&store),
            config.calls.clone(),
        );

        // Create app state with mocks
        let ws = WsBroadcaster::default();
        let state = Arc::new(AppState::new(
            config,
            gateway,
            store,
            workflow,
            calls.clone(),
            ws.clone(),
        ));

        // Create router
        let router = creatorflow_server::api::create_router(state);

        Self {
            router,
            generative,
            telephony,
            conversations,
            calls,
            ws,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Route stages and advisors through the mock generative client
    pub enable_generative: bool,
}

impl TestConfig {
    /// Create config with the mock generative client enabled.
    pub fn with_generative() -> Self {
        Self {
            enable_generative: true,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
