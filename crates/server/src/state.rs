use std::sync::Arc;

use creatorflow_core::{
    advisor::{FollowUpAdvisor, NegotiationAdvisor, QueryAnalyzer},
    calls::{CallSnapshot, Subscription},
    pipeline::{CampaignSynthesizer, CandidateScorer, OutreachDispatcher},
    CallLifecycleManager, CampaignWorkflow, Config, ConversationStore, GenerativeGateway,
    SanitizedConfig, SlidingWindowLimiter,
};

/// Generative calls spent when a single creator is scored on request.
const SINGLE_SCORE_AI_BUDGET: usize = 1;

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    limiter: Arc<SlidingWindowLimiter>,
    conversations: Arc<dyn ConversationStore>,
    workflow: CampaignWorkflow,
    campaign: CampaignSynthesizer,
    scorer: CandidateScorer,
    outreach: OutreachDispatcher,
    negotiation: NegotiationAdvisor,
    follow_up: FollowUpAdvisor,
    query: QueryAnalyzer,
    calls: CallLifecycleManager,
    ws_broadcaster: WsBroadcaster,
    /// Relays call snapshots to WebSocket clients for as long as the state lives.
    _call_relay: Subscription,
}

impl AppState {
    /// Wire the shared components. One limiter and one gateway serve every
    /// stage and advisor.
    pub fn new(
        config: Config,
        gateway: GenerativeGateway,
        conversations: Arc<dyn ConversationStore>,
        workflow: CampaignWorkflow,
        calls: CallLifecycleManager,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        let advisor_budget = config.pipeline.advisor_wait_budget();
        let pipeline = &config.pipeline;
        let relay = ws_broadcaster.clone();
        let call_relay = calls.subscribe(Arc::new(move |snapshot: &CallSnapshot| {
            relay.call_snapshot(snapshot);
        }));

        Self {
            limiter: Arc::clone(gateway.limiter()),
            campaign: CampaignSynthesizer::new(gateway.clone(), pipeline.campaign_wait_budget()),
            scorer: CandidateScorer::new(
                gateway.clone(),
                SINGLE_SCORE_AI_BUDGET,
                pipeline.scoring_wait_budget(),
            ),
            outreach: OutreachDispatcher::new(
                gateway.clone(),
                Arc::clone(&conversations),
                pipeline.outreach_top_n,
                pipeline.outreach_wait_budget(),
            ),
            negotiation: NegotiationAdvisor::new(gateway.clone(), advisor_budget),
            follow_up: FollowUpAdvisor::new(gateway.clone(), advisor_budget),
            query: QueryAnalyzer::new(gateway, advisor_budget),
            config,
            conversations,
            workflow,
            calls,
            ws_broadcaster,
            _call_relay: call_relay,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        self.limiter.as_ref()
    }

    pub fn conversations(&self) -> &dyn ConversationStore {
        self.conversations.as_ref()
    }

    pub fn workflow(&self) -> &CampaignWorkflow {
        &self.workflow
    }

    pub fn campaign(&self) -> &CampaignSynthesizer {
        &self.campaign
    }

    pub fn scorer(&self) -> &CandidateScorer {
        &self.scorer
    }

    pub fn outreach(&self) -> &OutreachDispatcher {
        &self.outreach
    }

    pub fn negotiation(&self) -> &NegotiationAdvisor {
        &self.negotiation
    }

    pub fn follow_up(&self) -> &FollowUpAdvisor {
        &self.follow_up
    }

    pub fn query_analyzer(&self) -> &QueryAnalyzer {
        &self.query
    }

    pub fn calls(&self) -> &CallLifecycleManager {
        &self.calls
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
