//! Candidate scoring against a campaign plan.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    CampaignPlan, Creator, CreatorMatch, EstimatedPerformance, FitAnalysis, GenerationMethod,
    PipelineStage, RecommendedAction, ScoringInput, StageError, StageOutcome,
};
use crate::generative::GenerativeGateway;

const AI_CONFIDENCE: f32 = 0.8;
const ALGORITHMIC_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You evaluate how well a creator fits a brand campaign. Reply \
with a JSON object: {\"score\": 0-100, \"reasoning\": \"...\", \"strengths\": [...], \
\"concerns\": [...], \"fit_analysis\": {\"audience_alignment\", \"content_quality\", \
\"engagement_rate_fit\", \"brand_safety\", \"cost_efficiency\"}, \"estimated_performance\": \
{\"reach\", \"engagement\", \"roi\"}, \"confidence\": 0.0-1.0}.";

/// Scores each candidate, spending at most `ai_budget` generative calls.
///
/// Candidates beyond the budget, or whose generative evaluation fails, get
/// the algorithmic score.
pub struct CandidateScorer {
    gateway: GenerativeGateway,
    ai_budget: usize,
    wait_budget: Duration,
}

#[derive(Debug, Deserialize)]
struct Evaluation {
    score: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    concerns: Vec<String>,
    fit_analysis: Option<FitAnalysis>,
    estimated_performance: Option<EstimatedPerformance>,
    confidence: Option<f32>,
}

impl CandidateScorer {
    pub fn new(gateway: GenerativeGateway, ai_budget: usize, wait_budget: Duration) -> Self {
        Self {
            gateway,
            ai_budget,
            wait_budget,
        }
    }

    fn build_prompt(plan: &CampaignPlan, creator: &Creator) -> String {
        format!(
            "Campaign: {}\nBrand: {}\nPlatforms: {}\nNiches: {}\nMinimum followers: {}\nBudget: {} - {}\n\n\
             Creator: {} (@{})\nPlatform: {}\nFollowers: {}\nEngagement rate: {}%\nNiches: {}\n\
             Location: {}\nRate per post: {}\nBio: {}",
            plan.title,
            plan.brand,
            plan.platforms.join(", "),
            plan.niches.join(", "),
            plan.min_followers,
            plan.budget_min,
            plan.budget_max,
            creator.name,
            creator.handle,
            creator.platform,
            creator.followers,
            creator.engagement_rate,
            creator.niches.join(", "),
            creator.location,
            creator.rate_per_post,
            creator.bio,
        )
    }

    async fn evaluate(
        &self,
        plan: &CampaignPlan,
        creator: &Creator,
    ) -> Result<CreatorMatch, StageError> {
        let request = self
            .gateway
            .request(SYSTEM_PROMPT, Self::build_prompt(plan, creator));
        let evaluation: Evaluation = self
            .gateway
            .generate_json(self.name(), request, self.wait_budget)
            .await?;

        if !(0.0..=100.0).contains(&evaluation.score) {
            return Err(StageError::Invalid(format!(
                "score {} out of range",
                evaluation.score
            )));
        }

        let score = evaluation.score.round() as u32;
        let fallback = algorithmic_match(plan, creator);
        Ok(CreatorMatch {
            creator: creator.clone(),
            score,
            reasoning: evaluation.reasoning,
            strengths: evaluation.strengths,
            concerns: evaluation.concerns,
            fit_analysis: evaluation.fit_analysis.unwrap_or(fallback.fit_analysis),
            estimated_performance: evaluation
                .estimated_performance
                .unwrap_or(fallback.estimated_performance),
            recommended_action: RecommendedAction::from_score(score),
            method: GenerationMethod::AiGenerated,
            confidence: evaluation
                .confidence
                .unwrap_or(AI_CONFIDENCE)
                .clamp(0.0, 1.0),
        })
    }

    /// Score a single creator, falling back to the rule-based score.
    pub async fn score_creator(
        &self,
        plan: &CampaignPlan,
        creator: &Creator,
    ) -> StageOutcome<CreatorMatch> {
        match self.evaluate(plan, creator).await {
            Ok(scored) => {
                let confidence = scored.confidence;
                StageOutcome::generated(scored, confidence)
            }
            Err(e) => {
                debug!(creator_id = %creator.id, error = %e, "Scoring creator with rules");
                StageOutcome::fallback(
                    algorithmic_match(plan, creator),
                    ALGORITHMIC_CONFIDENCE,
                    e.to_string(),
                )
            }
        }
    }
}

/// Rule-based score for one creator.
///
/// Base 50, plus 10 for a targeted platform, 10 for meeting the follower
/// minimum and 5 for a rate within budget.
pub fn algorithmic_match(plan: &CampaignPlan, creator: &Creator) -> CreatorMatch {
    let on_platform = plan.targets_platform(&creator.platform);
    let enough_followers = creator.followers >= plan.min_followers;
    let within_budget = creator.rate_per_post <= plan.budget_max;

    let mut score = 50u32;
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();

    if on_platform {
        score += 10;
        strengths.push(format!("Active on {}", creator.platform));
    } else {
        concerns.push(format!("{} is not a campaign platform", creator.platform));
    }
    if enough_followers {
        score += 10;
        strengths.push(format!("{} followers", creator.followers));
    } else {
        concerns.push(format!(
            "Below the {} follower minimum",
            plan.min_followers
        ));
    }
    if within_budget {
        score += 5;
        strengths.push("Rate fits the budget".to_string());
    } else {
        concerns.push("Rate exceeds the budget".to_string());
    }

    CreatorMatch {
        creator: creator.clone(),
        score,
        reasoning: format!(
            "Rule-based score for {} on {}: platform, audience size and cost checks.",
            creator.name, creator.platform
        ),
        strengths,
        concerns,
        fit_analysis: FitAnalysis {
            audience_alignment: (score as f64 * 0.8).round() as u32,
            content_quality: 60,
            engagement_rate_fit: (score as f64 * 0.7).round() as u32,
            brand_safety: 75,
            cost_efficiency: if within_budget { 70 } else { 50 },
        },
        estimated_performance: EstimatedPerformance {
            reach: (creator.followers as f64 * 0.7).round() as u64,
            engagement: (creator.followers as f64 * creator.engagement_rate / 100.0).round() as u64,
            roi: 1.5,
        },
        recommended_action: RecommendedAction::from_score(score),
        method: GenerationMethod::AlgorithmicFallback,
        confidence: ALGORITHMIC_CONFIDENCE,
    }
}

fn sort_matches(matches: &mut [CreatorMatch]) {
    matches.sort_by(|a, b| b.score.cmp(&a.score));
}

fn mean_confidence(matches: &[CreatorMatch]) -> f32 {
    if matches.is_empty() {
        return ALGORITHMIC_CONFIDENCE;
    }
    matches.iter().map(|m| m.confidence).sum::<f32>() / matches.len() as f32
}

#[async_trait]
impl PipelineStage for CandidateScorer {
    type Input = ScoringInput;
    type Output = Vec<CreatorMatch>;

    fn name(&self) -> &'static str {
        "scoring"
    }

    async fn run(&self, input: &ScoringInput) -> StageOutcome<Vec<CreatorMatch>> {
        let mut matches = Vec::with_capacity(input.candidates.len());
        let mut attempts = 0usize;
        let mut ai_scored = 0usize;
        let mut last_error: Option<StageError> = None;

        for creator in &input.candidates {
            if attempts < self.ai_budget {
                attempts += 1;
                match self.evaluate(&input.plan, creator).await {
                    Ok(scored) => {
                        ai_scored += 1;
                        matches.push(scored);
                        continue;
                    }
                    Err(e) => {
                        debug!(creator_id = %creator.id, error = %e, "Scoring creator with rules");
                        last_error = Some(e);
                    }
                }
            }
            matches.push(algorithmic_match(&input.plan, creator));
        }

        sort_matches(&mut matches);
        info!(
            candidates = input.candidates.len(),
            ai_scored,
            "Candidates scored"
        );

        if ai_scored > 0 {
            let confidence = mean_confidence(&matches);
            return StageOutcome::generated(matches, confidence);
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "generative scoring budget is zero".to_string());
        StageOutcome::fallback(matches, ALGORITHMIC_CONFIDENCE, reason)
    }

    fn fallback(
        &self,
        input: &ScoringInput,
        error: &StageError,
    ) -> StageOutcome<Vec<CreatorMatch>> {
        let mut matches: Vec<CreatorMatch> = input
            .candidates
            .iter()
            .map(|c| algorithmic_match(&input.plan, c))
            .collect();
        sort_matches(&mut matches);
        StageOutcome::fallback(matches, ALGORITHMIC_CONFIDENCE, error.to_string())
    }
}
