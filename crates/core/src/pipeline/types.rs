//! Data flowing through the campaign workflow.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{GenerationMethod, StageOutcome};

/// What the business asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessRequirements {
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub campaign_objective: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub preferred_platforms: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    /// Write outreach with the generative capability instead of the template.
    #[serde(default)]
    pub personalized_outreach: bool,
}

/// A synthesized campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPlan {
    pub title: String,
    pub brand: String,
    pub description: String,
    pub brief: String,
    pub platforms: Vec<String>,
    pub min_followers: u64,
    pub niches: Vec<String>,
    pub locations: Vec<String>,
    pub deliverables: Vec<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub application_deadline: NaiveDate,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl CampaignPlan {
    pub fn targets_platform(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
    }
}

/// A creator in the discovery pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub platform: String,
    pub followers: u64,
    /// Percent, e.g. 4.2 for 4.2%.
    pub engagement_rate: f64,
    pub niches: Vec<String>,
    pub location: String,
    /// Quoted price for a single post.
    pub rate_per_post: f64,
    #[serde(default)]
    pub bio: String,
}

/// Recommendation attached to a scored creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    NotRecommended,
    Consider,
    Recommend,
    HighlyRecommend,
}

impl RecommendedAction {
    /// Thresholds: 80 and up, 65 and up, 45 and up, below 45.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => RecommendedAction::HighlyRecommend,
            65..=79 => RecommendedAction::Recommend,
            45..=64 => RecommendedAction::Consider,
            _ => RecommendedAction::NotRecommended,
        }
    }

    pub fn is_recommend_or_better(&self) -> bool {
        *self >= RecommendedAction::Recommend
    }
}

/// Per-dimension fit, each 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitAnalysis {
    pub audience_alignment: u32,
    pub content_quality: u32,
    pub engagement_rate_fit: u32,
    pub brand_safety: u32,
    pub cost_efficiency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedPerformance {
    pub reach: u64,
    pub engagement: u64,
    pub roi: f64,
}

/// A creator scored against a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorMatch {
    pub creator: Creator,
    /// 0-100.
    pub score: u32,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub fit_analysis: FitAnalysis,
    pub estimated_performance: EstimatedPerformance,
    pub recommended_action: RecommendedAction,
    pub method: GenerationMethod,
    pub confidence: f32,
}

/// Input of the scoring stage.
#[derive(Debug, Clone)]
pub struct ScoringInput {
    pub plan: CampaignPlan,
    pub candidates: Vec<Creator>,
}

/// Input of the outreach stage.
#[derive(Debug, Clone)]
pub struct DispatchInput {
    pub plan: CampaignPlan,
    pub matches: Vec<CreatorMatch>,
    /// Draft each message with the generative capability.
    pub personalized: bool,
}

/// A single outreach message composed on request, not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub creator_id: String,
    pub subject: String,
    pub body: String,
}

/// One composed outreach message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub creator_id: String,
    pub creator_name: String,
    pub subject: String,
    pub body: String,
    pub method: GenerationMethod,
    /// Whether the message reached the conversation record.
    pub persisted: bool,
}

/// Outcome of the outreach stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub total_sent: u32,
    pub ai_generated: u32,
    pub template_based: u32,
    pub failed: u32,
    pub messages: Vec<OutreachMessage>,
}

/// Timing and method of one executed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub method: GenerationMethod,
    pub confidence: f32,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInsights {
    pub elapsed_ms: u64,
    pub agents_used: Vec<String>,
    /// Mean stage confidence, or a fixed low value when the run halted.
    pub confidence_score: f32,
    pub next_steps: Vec<String>,
    pub stages: Vec<StageReport>,
}

/// Everything a workflow run produced.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub campaign: StageOutcome<CampaignPlan>,
    pub candidates_found: usize,
    pub creator_matches: Vec<CreatorMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outreach: Option<DispatchSummary>,
    pub insights: WorkflowInsights,
    /// Stage at which the run stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}
