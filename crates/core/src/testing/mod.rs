//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (generative client, telephony service, conversation storage), allowing the
//! workflow and the call lifecycle to be exercised without real providers.
//!
//! # Example
//!
//! ```rust,ignore
//! use creatorflow_core::testing::{fixtures, MockGenerativeClient, MockTelephony};
//!
//! let client = Arc::new(MockGenerativeClient::new());
//! client.push_response(r#"{"creator_ids": ["cr-001"]}"#).await;
//! let gateway = fixtures::gateway(client.clone());
//!
//! let telephony = Arc::new(MockTelephony::new());
//! telephony.script_statuses(&["ringing", "completed"]).await;
//! ```

mod memory_store;
mod mock_generative;
mod mock_telephony;

pub use memory_store::InMemoryConversationStore;
pub use mock_generative::MockGenerativeClient;
pub use mock_telephony::{MockTelephony, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;
    use std::sync::Arc;

    use crate::generative::{GenerativeClient, GenerativeGateway};
    use crate::pipeline::{BusinessRequirements, CampaignPlan};
    use crate::rate_limiter::{RateLimitConfig, SlidingWindowLimiter};
    use crate::telephony::{CallArtifacts, TranscriptTurn};

    /// A limiter roomy enough that tests never wait on it.
    pub fn limiter() -> Arc<SlidingWindowLimiter> {
        Arc::new(SlidingWindowLimiter::new(&RateLimitConfig {
            capacity: 1_000,
            window_ms: 60_000,
            safety_margin_ms: 0,
        }))
    }

    /// Gateway backed by `client` and a roomy limiter.
    pub fn gateway<C: GenerativeClient + 'static>(client: Arc<C>) -> GenerativeGateway {
        GenerativeGateway::new(limiter(), Some(client))
    }

    /// Gateway with no client configured.
    pub fn disabled_gateway() -> GenerativeGateway {
        GenerativeGateway::disabled(limiter())
    }

    /// Requirements of a beauty brand on Instagram and YouTube.
    pub fn requirements() -> BusinessRequirements {
        BusinessRequirements {
            company_name: "Glow Naturals".to_string(),
            industry: "Beauty".to_string(),
            campaign_objective: "launch a mineral sunscreen range".to_string(),
            target_audience: "Women 20-35 interested in skincare".to_string(),
            product_description: Some("Reef-safe SPF 50 sunscreen".to_string()),
            budget_min: Some(20_000.0),
            budget_max: Some(60_000.0),
            preferred_platforms: vec!["Instagram".to_string(), "YouTube".to_string()],
            locations: vec!["India".to_string()],
            special_requirements: None,
            personalized_outreach: false,
        }
    }

    /// A finished plan for the requirements above.
    pub fn plan() -> CampaignPlan {
        CampaignPlan {
            title: "Glow Naturals Launch Campaign".to_string(),
            brand: "Glow Naturals".to_string(),
            description: "Launch of the mineral sunscreen range".to_string(),
            brief: "Show the sunscreen in a daily skincare routine".to_string(),
            platforms: vec!["instagram".to_string(), "youtube".to_string()],
            min_followers: 10_000,
            niches: vec![
                "beauty".to_string(),
                "skincare".to_string(),
                "lifestyle".to_string(),
            ],
            locations: vec!["India".to_string()],
            deliverables: vec![
                "1 Instagram reel".to_string(),
                "1 YouTube integration".to_string(),
            ],
            budget_min: 16_000.0,
            budget_max: 54_000.0,
            start_date: date(2024, 3, 8),
            end_date: date(2024, 4, 7),
            application_deadline: date(2024, 3, 5),
            insights: Vec::new(),
        }
    }

    /// Artifacts of a finished call with `turns` alternating turns.
    pub fn call_artifacts(turns: usize) -> CallArtifacts {
        CallArtifacts {
            recording_url: Some("https://recordings.example/call.mp3".to_string()),
            duration_seconds: Some(95),
            transcript_turns: Some(
                (0..turns)
                    .map(|i| TranscriptTurn {
                        speaker: if i % 2 == 0 { "agent" } else { "creator" }.to_string(),
                        text: format!("Turn {}", i + 1),
                    })
                    .collect(),
            ),
            context_id: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }
}
