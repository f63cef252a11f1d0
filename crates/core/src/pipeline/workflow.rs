//! Runs the four pipeline stages in order and aggregates their results.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::{
    BusinessRequirements, CampaignSynthesizer, CandidateScorer, CreatorDiscovery, CreatorPool,
    DispatchInput, OutreachDispatcher, PipelineConfig, PipelineStage, ScoringInput, StageError,
    StageOutcome, StageReport, WorkflowInsights, WorkflowResult,
};
use crate::conversation::ConversationStore;
use crate::generative::GenerativeGateway;
use crate::metrics;

/// Confidence reported when the run stops after discovery.
pub const HALTED_CONFIDENCE: f32 = 0.3;

/// The campaign workflow: synthesis, discovery, scoring, outreach.
///
/// Stages run strictly one after another. A stage that panics is replaced by
/// its fallback, so [`run`](Self::run) always returns a result.
pub struct CampaignWorkflow {
    campaign: CampaignSynthesizer,
    discovery: CreatorDiscovery,
    scoring: CandidateScorer,
    outreach: OutreachDispatcher,
}

impl CampaignWorkflow {
    pub fn new(
        gateway: GenerativeGateway,
        pool: Arc<CreatorPool>,
        store: Arc<dyn ConversationStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            campaign: CampaignSynthesizer::new(gateway.clone(), config.campaign_wait_budget()),
            discovery: CreatorDiscovery::new(gateway.clone(), pool, config.discovery_wait_budget()),
            scoring: CandidateScorer::new(
                gateway.clone(),
                config.scoring_ai_budget,
                config.scoring_wait_budget(),
            ),
            outreach: OutreachDispatcher::new(
                gateway,
                store,
                config.outreach_top_n,
                config.outreach_wait_budget(),
            ),
        }
    }

    pub async fn run(&self, requirements: BusinessRequirements) -> WorkflowResult {
        let started = Instant::now();
        let mut reports = Vec::with_capacity(4);

        info!(company = %requirements.company_name, "Starting campaign workflow");

        let campaign = guarded(&self.campaign, &requirements, &mut reports).await;
        let plan = campaign.value().clone();

        let candidates = guarded(&self.discovery, &plan, &mut reports)
            .await
            .into_value();

        if candidates.is_empty() {
            warn!(title = %plan.title, "No creators found, stopping after discovery");
            let elapsed_ms = started.elapsed().as_millis() as u64;
            metrics::WORKFLOW_DURATION
                .with_label_values(&["halted"])
                .observe(elapsed_ms as f64 / 1000.0);

            return WorkflowResult {
                campaign,
                candidates_found: 0,
                creator_matches: Vec::new(),
                outreach: None,
                insights: WorkflowInsights {
                    elapsed_ms,
                    agents_used: agents_used(&reports),
                    confidence_score: HALTED_CONFIDENCE,
                    next_steps: vec![
                        "Adjust the campaign criteria and run the workflow again".to_string(),
                    ],
                    stages: reports,
                },
                halted_at: Some("discovery".to_string()),
                suggestions: vec![
                    "Broaden the target niches".to_string(),
                    "Add more platforms to the campaign".to_string(),
                    "Lower the minimum follower requirement".to_string(),
                    "Widen the target locations".to_string(),
                ],
            };
        }

        let candidates_found = candidates.len();
        let scoring_input = ScoringInput {
            plan: plan.clone(),
            candidates,
        };
        let matches = guarded(&self.scoring, &scoring_input, &mut reports)
            .await
            .into_value();

        let dispatch_input = DispatchInput {
            plan,
            matches,
            personalized: requirements.personalized_outreach,
        };
        let outreach = guarded(&self.outreach, &dispatch_input, &mut reports)
            .await
            .into_value();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let confidence_score =
            reports.iter().map(|r| r.confidence).sum::<f32>() / reports.len() as f32;
        metrics::WORKFLOW_DURATION
            .with_label_values(&["completed"])
            .observe(elapsed_ms as f64 / 1000.0);

        info!(
            elapsed_ms,
            candidates = candidates_found,
            sent = outreach.total_sent,
            confidence = confidence_score,
            "Campaign workflow finished"
        );

        let mut next_steps = Vec::new();
        if outreach.total_sent > 0 {
            next_steps.push(format!(
                "Track replies from the {} contacted creators",
                outreach.total_sent
            ));
        } else {
            next_steps.push("Review the matches and contact creators manually".to_string());
        }
        if outreach.failed > 0 {
            next_steps.push(format!("Retry {} failed outreach messages", outreach.failed));
        }
        next_steps.push("Prepare negotiation terms for interested creators".to_string());

        WorkflowResult {
            campaign,
            candidates_found,
            creator_matches: dispatch_input.matches,
            outreach: Some(outreach),
            insights: WorkflowInsights {
                elapsed_ms,
                agents_used: agents_used(&reports),
                confidence_score,
                next_steps,
                stages: reports,
            },
            halted_at: None,
            suggestions: Vec::new(),
        }
    }
}

fn agents_used(reports: &[StageReport]) -> Vec<String> {
    reports.iter().map(|r| r.stage.clone()).collect()
}

/// Run a stage, converting a panic into its fallback, and record the report.
async fn guarded<S: PipelineStage>(
    stage: &S,
    input: &S::Input,
    reports: &mut Vec<StageReport>,
) -> StageOutcome<S::Output> {
    let started = Instant::now();
    let outcome = match AssertUnwindSafe(stage.run(input)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(stage = stage.name(), "Stage panicked, using fallback");
            stage.fallback(input, &StageError::Panicked)
        }
    };

    metrics::STAGE_OUTCOMES
        .with_label_values(&[stage.name(), outcome.method().as_str()])
        .inc();

    reports.push(StageReport {
        stage: stage.name().to_string(),
        method: outcome.method(),
        confidence: outcome.confidence(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        fallback_reason: outcome.fallback_reason().map(str::to_string),
    });

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Creator, GenerationMethod};
    use crate::testing::{fixtures, InMemoryConversationStore, MockGenerativeClient};
    use async_trait::async_trait;

    fn workflow(gateway: GenerativeGateway, pool: CreatorPool) -> CampaignWorkflow {
        CampaignWorkflow::new(
            gateway,
            Arc::new(pool),
            Arc::new(InMemoryConversationStore::new()),
            &PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_all_fallback_run_completes() {
        let wf = workflow(fixtures::disabled_gateway(), CreatorPool::builtin());
        let result = wf.run(fixtures::requirements()).await;

        assert!(result.halted_at.is_none());
        assert!(result.campaign.is_fallback());
        assert!(result.candidates_found > 0);
        assert!(result.outreach.is_some());
        assert_eq!(result.insights.stages.len(), 4);
        assert!(result
            .insights
            .stages
            .iter()
            .all(|s| s.method == GenerationMethod::AlgorithmicFallback));
        assert_eq!(
            result.insights.agents_used,
            vec!["campaign", "discovery", "scoring", "outreach"]
        );
    }

    #[tokio::test]
    async fn test_failing_client_degrades_every_stage() {
        let client = Arc::new(MockGenerativeClient::failing());
        let wf = workflow(fixtures::gateway(client), CreatorPool::builtin());
        let result = wf.run(fixtures::requirements()).await;

        assert!(result
            .insights
            .stages
            .iter()
            .all(|s| s.method == GenerationMethod::AlgorithmicFallback));
        assert!(result
            .creator_matches
            .iter()
            .all(|m| m.method == GenerationMethod::AlgorithmicFallback));
    }

    #[tokio::test]
    async fn test_empty_discovery_halts() {
        let wf = workflow(fixtures::disabled_gateway(), CreatorPool::new(Vec::new()));
        let result = wf.run(fixtures::requirements()).await;

        assert_eq!(result.halted_at.as_deref(), Some("discovery"));
        assert!(result.creator_matches.is_empty());
        assert!(result.outreach.is_none());
        assert!(!result.suggestions.is_empty());
        assert_eq!(result.insights.confidence_score, HALTED_CONFIDENCE);
        assert_eq!(result.insights.agents_used, vec!["campaign", "discovery"]);
    }

    struct PanickingStage;

    #[async_trait]
    impl PipelineStage for PanickingStage {
        type Input = u32;
        type Output = Vec<Creator>;

        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn run(&self, _input: &u32) -> StageOutcome<Vec<Creator>> {
            panic!("boom")
        }

        fn fallback(&self, _input: &u32, error: &StageError) -> StageOutcome<Vec<Creator>> {
            StageOutcome::fallback(Vec::new(), 0.1, error.to_string())
        }
    }

    #[tokio::test]
    async fn test_guard_converts_panic_to_fallback() {
        let mut reports = Vec::new();
        let outcome = guarded(&PanickingStage, &7, &mut reports).await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.fallback_reason(), Some("stage panicked"));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stage, "panicking");
    }
}
