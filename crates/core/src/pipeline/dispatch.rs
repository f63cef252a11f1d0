//! Outreach dispatch: compose and record messages for the best matches.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    CampaignPlan, CreatorMatch, DispatchInput, DispatchSummary, GenerationMethod, OutreachDraft,
    OutreachMessage, PipelineStage, StageError, StageOutcome,
};
use crate::conversation::{ConversationMessage, ConversationStore, MessageKind};
use crate::generative::GenerativeGateway;

const AI_CONFIDENCE: f32 = 0.8;
const TEMPLATE_CONFIDENCE: f32 = 0.6;

/// Sender recorded on outreach messages.
pub const BRAND_SENDER: &str = "brand";

const SYSTEM_PROMPT: &str = "You write short, warm and specific collaboration invitations \
from a brand to a social media creator. Reply with a JSON object: {\"subject\": \"...\", \
\"message\": \"...\"}.";

/// Sends outreach to the top recommended matches and records each message in
/// the creator's conversation.
pub struct OutreachDispatcher {
    gateway: GenerativeGateway,
    store: Arc<dyn ConversationStore>,
    top_n: usize,
    wait_budget: Duration,
}

#[derive(Debug, Deserialize)]
struct Draft {
    subject: Option<String>,
    #[serde(alias = "body")]
    message: Option<String>,
}

impl OutreachDispatcher {
    pub fn new(
        gateway: GenerativeGateway,
        store: Arc<dyn ConversationStore>,
        top_n: usize,
        wait_budget: Duration,
    ) -> Self {
        Self {
            gateway,
            store,
            top_n,
            wait_budget,
        }
    }

    fn build_prompt(plan: &CampaignPlan, m: &CreatorMatch) -> String {
        format!(
            "Brand: {}\nCampaign: {}\nDescription: {}\nDeliverables: {}\nBudget: {:.0} - {:.0}\n\
             Application deadline: {}\n\nCreator: {} (@{}) on {}\nWhy they fit: {}",
            plan.brand,
            plan.title,
            plan.description,
            plan.deliverables.join(", "),
            plan.budget_min,
            plan.budget_max,
            plan.application_deadline,
            m.creator.name,
            m.creator.handle,
            m.creator.platform,
            m.reasoning,
        )
    }

    async fn compose(
        &self,
        plan: &CampaignPlan,
        m: &CreatorMatch,
        personalized: bool,
    ) -> (String, String, GenerationMethod) {
        if !personalized {
            let (subject, body) = template_message(plan, m);
            return (subject, body, GenerationMethod::AlgorithmicFallback);
        }

        let request = self.gateway.request(SYSTEM_PROMPT, Self::build_prompt(plan, m));
        match self
            .gateway
            .generate_json::<Draft>(self.name(), request, self.wait_budget)
            .await
        {
            Ok(Draft {
                subject: Some(subject),
                message: Some(body),
            }) if !subject.trim().is_empty() && !body.trim().is_empty() => (
                subject.trim().to_string(),
                body.trim().to_string(),
                GenerationMethod::AiGenerated,
            ),
            Ok(_) => {
                debug!(creator_id = %m.creator.id, "Incomplete draft, using template");
                let (subject, body) = template_message(plan, m);
                (subject, body, GenerationMethod::AlgorithmicFallback)
            }
            Err(e) => {
                debug!(creator_id = %m.creator.id, error = %e, "Using outreach template");
                let (subject, body) = template_message(plan, m);
                (subject, body, GenerationMethod::AlgorithmicFallback)
            }
        }
    }

    /// Compose one message for `m` without recording it.
    pub async fn draft(
        &self,
        plan: &CampaignPlan,
        m: &CreatorMatch,
        personalized: bool,
    ) -> StageOutcome<OutreachDraft> {
        let (subject, body, method) = self.compose(plan, m, personalized).await;
        let draft = OutreachDraft {
            creator_id: m.creator.id.clone(),
            subject,
            body,
        };

        match method {
            GenerationMethod::AiGenerated => StageOutcome::generated(draft, AI_CONFIDENCE),
            GenerationMethod::AlgorithmicFallback if personalized => {
                StageOutcome::fallback(draft, TEMPLATE_CONFIDENCE, "generated draft unavailable")
            }
            GenerationMethod::AlgorithmicFallback => StageOutcome::fallback(
                draft,
                TEMPLATE_CONFIDENCE,
                "personalized outreach not requested",
            ),
        }
    }

    fn record(
        &self,
        plan: &CampaignPlan,
        m: &CreatorMatch,
        subject: &str,
        body: &str,
        method: GenerationMethod,
    ) -> bool {
        let message = ConversationMessage::new(BRAND_SENDER, MessageKind::Outreach, body)
            .with_metadata("subject", subject)
            .with_metadata("method", method.as_str())
            .with_metadata("campaign", plan.title.as_str());

        match self.store.append_message(&m.creator.id, &message) {
            Ok(()) => true,
            Err(e) => {
                warn!(creator_id = %m.creator.id, error = %e, "Failed to record outreach");
                false
            }
        }
    }
}

/// Matches worth contacting, best first.
pub fn select_recipients(matches: &[CreatorMatch], top_n: usize) -> Vec<&CreatorMatch> {
    let mut selected: Vec<&CreatorMatch> = matches
        .iter()
        .filter(|m| m.recommended_action.is_recommend_or_better())
        .collect();
    selected.sort_by(|a, b| b.score.cmp(&a.score));
    selected.truncate(top_n);
    selected
}

/// Subject and body composed without the generative capability.
pub fn template_message(plan: &CampaignPlan, m: &CreatorMatch) -> (String, String) {
    let subject = format!(
        "Collaboration Opportunity: {} x {}",
        plan.brand, m.creator.name
    );

    let mut body = format!(
        "Hi {},\n\nWe're {} and we loved your {} content. We're launching \"{}\" and think \
         you'd be a great fit.\n\n{}\n",
        m.creator.name, plan.brand, m.creator.platform, plan.title, plan.description
    );
    if !plan.deliverables.is_empty() {
        body.push_str(&format!("\nDeliverables: {}\n", plan.deliverables.join(", ")));
    }
    body.push_str(&format!(
        "Budget range: {:.0} - {:.0}\nCampaign dates: {} to {}\nPlease reply by {}.\n\n\
         Best regards,\n{} Team",
        plan.budget_min,
        plan.budget_max,
        plan.start_date,
        plan.end_date,
        plan.application_deadline,
        plan.brand,
    ));

    (subject, body)
}

#[async_trait]
impl PipelineStage for OutreachDispatcher {
    type Input = DispatchInput;
    type Output = DispatchSummary;

    fn name(&self) -> &'static str {
        "outreach"
    }

    async fn run(&self, input: &DispatchInput) -> StageOutcome<DispatchSummary> {
        let recipients = select_recipients(&input.matches, self.top_n);
        let mut summary = DispatchSummary::default();

        for m in recipients {
            let (subject, body, method) = self.compose(&input.plan, m, input.personalized).await;
            let persisted = self.record(&input.plan, m, &subject, &body, method);

            if persisted {
                summary.total_sent += 1;
                match method {
                    GenerationMethod::AiGenerated => summary.ai_generated += 1,
                    GenerationMethod::AlgorithmicFallback => summary.template_based += 1,
                }
            } else {
                summary.failed += 1;
            }

            summary.messages.push(OutreachMessage {
                creator_id: m.creator.id.clone(),
                creator_name: m.creator.name.clone(),
                subject,
                body,
                method,
                persisted,
            });
        }

        info!(
            sent = summary.total_sent,
            ai_generated = summary.ai_generated,
            failed = summary.failed,
            "Outreach dispatched"
        );

        if summary
            .messages
            .iter()
            .any(|m| m.method == GenerationMethod::AiGenerated)
        {
            StageOutcome::generated(summary, AI_CONFIDENCE)
        } else if summary.messages.is_empty() {
            StageOutcome::fallback(
                summary,
                TEMPLATE_CONFIDENCE,
                "no recommended creators to contact",
            )
        } else if !input.personalized {
            StageOutcome::fallback(
                summary,
                TEMPLATE_CONFIDENCE,
                "personalized outreach not requested",
            )
        } else {
            StageOutcome::fallback(summary, TEMPLATE_CONFIDENCE, "messages composed from template")
        }
    }

    /// Compose template messages without recording them.
    fn fallback(&self, input: &DispatchInput, error: &StageError) -> StageOutcome<DispatchSummary> {
        let messages: Vec<OutreachMessage> = select_recipients(&input.matches, self.top_n)
            .into_iter()
            .map(|m| {
                let (subject, body) = template_message(&input.plan, m);
                OutreachMessage {
                    creator_id: m.creator.id.clone(),
                    creator_name: m.creator.name.clone(),
                    subject,
                    body,
                    method: GenerationMethod::AlgorithmicFallback,
                    persisted: false,
                }
            })
            .collect();

        let summary = DispatchSummary {
            total_sent: 0,
            ai_generated: 0,
            template_based: 0,
            failed: messages.len() as u32,
            messages,
        };
        StageOutcome::fallback(summary, TEMPLATE_CONFIDENCE, error.to_string())
    }
}
