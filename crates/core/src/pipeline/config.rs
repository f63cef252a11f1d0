//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Budgets for the campaign workflow stages.
///
/// Wait budgets bound how long a stage may wait on the shared admission gate
/// before it gives up on the generative capability and falls back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_campaign_wait_budget_ms")]
    pub campaign_wait_budget_ms: u64,

    #[serde(default = "default_discovery_wait_budget_ms")]
    pub discovery_wait_budget_ms: u64,

    /// Maximum generative calls the scoring stage makes per run. Every other
    /// candidate is scored algorithmically.
    #[serde(default = "default_scoring_ai_budget")]
    pub scoring_ai_budget: usize,

    #[serde(default = "default_scoring_wait_budget_ms")]
    pub scoring_wait_budget_ms: u64,

    /// Number of top matches that receive outreach.
    #[serde(default = "default_outreach_top_n")]
    pub outreach_top_n: usize,

    #[serde(default = "default_outreach_wait_budget_ms")]
    pub outreach_wait_budget_ms: u64,

    /// Wait budget for the standalone advisors (negotiation, follow-up, query).
    #[serde(default = "default_advisor_wait_budget_ms")]
    pub advisor_wait_budget_ms: u64,

    /// JSON file with the creator pool. The built-in roster is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_pool_path: Option<PathBuf>,
}

fn default_campaign_wait_budget_ms() -> u64 {
    15_000
}

fn default_discovery_wait_budget_ms() -> u64 {
    15_000
}

fn default_scoring_ai_budget() -> usize {
    1
}

fn default_scoring_wait_budget_ms() -> u64 {
    5_000
}

fn default_outreach_top_n() -> usize {
    3
}

fn default_outreach_wait_budget_ms() -> u64 {
    5_000
}

fn default_advisor_wait_budget_ms() -> u64 {
    10_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            campaign_wait_budget_ms: default_campaign_wait_budget_ms(),
            discovery_wait_budget_ms: default_discovery_wait_budget_ms(),
            scoring_ai_budget: default_scoring_ai_budget(),
            scoring_wait_budget_ms: default_scoring_wait_budget_ms(),
            outreach_top_n: default_outreach_top_n(),
            outreach_wait_budget_ms: default_outreach_wait_budget_ms(),
            advisor_wait_budget_ms: default_advisor_wait_budget_ms(),
            creator_pool_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn campaign_wait_budget(&self) -> Duration {
        Duration::from_millis(self.campaign_wait_budget_ms)
    }

    pub fn discovery_wait_budget(&self) -> Duration {
        Duration::from_millis(self.discovery_wait_budget_ms)
    }

    pub fn scoring_wait_budget(&self) -> Duration {
        Duration::from_millis(self.scoring_wait_budget_ms)
    }

    pub fn outreach_wait_budget(&self) -> Duration {
        Duration::from_millis(self.outreach_wait_budget_ms)
    }

    pub fn advisor_wait_budget(&self) -> Duration {
        Duration::from_millis(self.advisor_wait_budget_ms)
    }
}
