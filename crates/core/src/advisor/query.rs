use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::generative::GenerativeGateway;
use crate::pipeline::{PipelineStage, StageError, StageOutcome};

const AI_CONFIDENCE: f32 = 0.85;
const FALLBACK_CONFIDENCE: f32 = 0.40;
const KNOWN_PLATFORMS: [&str; 3] = ["instagram", "youtube", "tiktok"];

const SYSTEM_PROMPT: &str = "You interpret influencer marketing search queries. Reply with a \
JSON object: {\"intent\": \"...\", \"query_type\": \"budget_optimization\" | \
\"reach_maximization\" | \"engagement_focused\" | \"niche_targeting\" | \"general_search\", \
\"extracted_criteria\": {\"platforms\": [...], \"niches\": [...], \"follower_range\": \"...\", \
\"budget\": \"...\", \"location\": \"...\"}, \"key_requirements\": [...], \"confidence\": 0.0-1.0}. \
Omit criteria that are not mentioned.";

/// A free-text creator search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatorQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    BudgetOptimization,
    ReachMaximization,
    EngagementFocused,
    NicheTargeting,
    GeneralSearch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCriteria {
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub niches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: String,
    pub query_type: QueryType,
    pub extracted_criteria: ExtractedCriteria,
    #[serde(default)]
    pub key_requirements: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Draft {
    #[serde(flatten)]
    analysis: QueryAnalysis,
    confidence: Option<f32>,
}

/// Classifies a query by keyword. Budget wins over reach, reach over engagement.
pub fn classify_query(query: &str) -> QueryType {
    let lower = query.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has_any(&["budget", "cheap", "affordable"]) {
        QueryType::BudgetOptimization
    } else if has_any(&["reach", "followers", "audience"]) {
        QueryType::ReachMaximization
    } else if has_any(&["engagement", "interact"]) {
        QueryType::EngagementFocused
    } else {
        QueryType::GeneralSearch
    }
}

pub fn detect_platforms(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    KNOWN_PLATFORMS
        .iter()
        .filter(|p| lower.contains(*p))
        .map(|p| p.to_string())
        .collect()
}

/// Understands what a user is looking for in a creator search.
pub struct QueryAnalyzer {
    gateway: GenerativeGateway,
    wait_budget: Duration,
}

impl QueryAnalyzer {
    pub fn new(gateway: GenerativeGateway, wait_budget: Duration) -> Self {
        Self {
            gateway,
            wait_budget,
        }
    }

    pub async fn analyze(&self, query: &CreatorQuery) -> StageOutcome<QueryAnalysis> {
        self.run(query).await
    }
}

#[async_trait]
impl PipelineStage for QueryAnalyzer {
    type Input = CreatorQuery;
    type Output = QueryAnalysis;

    fn name(&self) -> &'static str {
        "query_analysis"
    }

    async fn run(&self, input: &CreatorQuery) -> StageOutcome<QueryAnalysis> {
        let prompt = match input
            .conversation_context
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            Some(context) => format!(
                "Previous messages:\n{}\n\nLatest query: \"{}\"",
                context, input.query
            ),
            None => format!("Query: \"{}\"", input.query),
        };
        let request = self.gateway.request(SYSTEM_PROMPT, prompt);

        match self
            .gateway
            .generate_json::<Draft>(self.name(), request, self.wait_budget)
            .await
        {
            Ok(draft) => StageOutcome::generated(
                draft.analysis,
                draft.confidence.unwrap_or(AI_CONFIDENCE),
            ),
            Err(e) => {
                debug!(error = %e, "Query analysis falling back to keywords");
                self.fallback(input, &StageError::from(e))
            }
        }
    }

    fn fallback(&self, input: &CreatorQuery, error: &StageError) -> StageOutcome<QueryAnalysis> {
        let excerpt: String = input.query.chars().take(70).collect();
        let analysis = QueryAnalysis {
            intent: "Looking for creators".to_string(),
            query_type: classify_query(&input.query),
            extracted_criteria: ExtractedCriteria {
                platforms: detect_platforms(&input.query),
                niches: vec!["general".to_string()],
                ..Default::default()
            },
            key_requirements: vec![format!("{} (keyword extraction)", excerpt)],
        };
        StageOutcome::fallback(analysis, FALLBACK_CONFIDENCE, error.to_string())
    }
}
