use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::generative::GenerativeGateway;
use crate::pipeline::{PipelineStage, StageError, StageOutcome};

const AI_CONFIDENCE: f32 = 0.8;
const FALLBACK_CONFIDENCE: f32 = 0.45;

const SYSTEM_PROMPT: &str = "You manage relationships for influencer collaborations and write \
follow-up emails. Reply with a JSON object: {\"subject\": \"...\", \"message\": \"...\", \
\"reasoning\": \"...\", \"key_points\": [...], \"next_steps\": [...], \"confidence\": 0.0-1.0}.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowUpContext {
    pub creator_name: String,
    #[serde(default)]
    pub creator_platform: String,
    pub brand_name: String,
    pub days_since_last_contact: u32,
    #[serde(default)]
    pub previous_email_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<String>,
}

/// How to approach a follow-up, chosen by the time since the last contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpStrategy {
    pub strategy: &'static str,
    pub tone: &'static str,
    pub focus: &'static str,
}

impl FollowUpStrategy {
    pub fn for_days(days: u32) -> Self {
        let (strategy, tone, focus) = match days {
            0..=3 => ("Wait Longer", "Patient", "Give space"),
            4..=7 => (
                "Gentle Reminder",
                "Friendly and understanding",
                "Soft check-in with added value",
            ),
            8..=14 => (
                "Value-Added Follow-up",
                "Professional and informative",
                "Share updates or an improved offer",
            ),
            15..=30 => (
                "Strategic Re-engagement",
                "Direct and respectful",
                "Best offer or deadline",
            ),
            _ => (
                "Relationship Preservation",
                "Gracious and future-focused",
                "Keep the door open",
            ),
        };
        Self {
            strategy,
            tone,
            focus,
        }
    }

    fn guidelines(days: u32) -> &'static str {
        match days {
            0..=7 => "Early follow-up: they may still be considering. Add value, no pressure.",
            8..=14 => "Mid-term follow-up: reference the campaign timeline and offer some flexibility.",
            15..=30 => "Late follow-up: likely the final attempt. Give the best offer with gentle urgency.",
            _ => "This campaign may not be a fit. Keep the door open for the future.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowUpMessage {
    pub subject: String,
    pub message: String,
    pub reasoning: String,
    pub key_points: Vec<String>,
    pub next_steps: Vec<String>,
    pub strategy: FollowUpStrategy,
}

#[derive(Debug, Deserialize)]
struct Draft {
    subject: String,
    #[serde(alias = "body")]
    message: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    next_steps: Vec<String>,
    confidence: Option<f32>,
}

/// Writes follow-ups for creators who have not answered yet.
pub struct FollowUpAdvisor {
    gateway: GenerativeGateway,
    wait_budget: Duration,
}

impl FollowUpAdvisor {
    pub fn new(gateway: GenerativeGateway, wait_budget: Duration) -> Self {
        Self {
            gateway,
            wait_budget,
        }
    }

    pub async fn compose(&self, context: &FollowUpContext) -> StageOutcome<FollowUpMessage> {
        self.run(context).await
    }

    fn build_prompt(context: &FollowUpContext, strategy: &FollowUpStrategy) -> String {
        let mut prompt = format!(
            "Creator: {} ({})\nBrand: {}\nDays since last contact: {}\nPrevious email: {}\n\
             Strategy: {}\nTone: {}\nFocus: {}\nGuidelines: {}\n",
            context.creator_name,
            context.creator_platform,
            context.brand_name,
            context.days_since_last_contact,
            context.previous_email_type,
            strategy.strategy,
            strategy.tone,
            strategy.focus,
            FollowUpStrategy::guidelines(context.days_since_last_contact),
        );
        if let Some(snippet) = context
            .conversation_context
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            prompt.push_str(&format!("\nRecent conversation:\n{}\n", snippet));
        }
        prompt
    }
}

#[async_trait]
impl PipelineStage for FollowUpAdvisor {
    type Input = FollowUpContext;
    type Output = FollowUpMessage;

    fn name(&self) -> &'static str {
        "follow_up"
    }

    async fn run(&self, input: &FollowUpContext) -> StageOutcome<FollowUpMessage> {
        let strategy = FollowUpStrategy::for_days(input.days_since_last_contact);
        let request = self
            .gateway
            .request(SYSTEM_PROMPT, Self::build_prompt(input, &strategy));

        let result = match self
            .gateway
            .generate_json::<Draft>(self.name(), request, self.wait_budget)
            .await
        {
            Ok(draft) if draft.subject.trim().is_empty() || draft.message.trim().is_empty() => Err(
                StageError::Invalid("empty subject or message".to_string()),
            ),
            Ok(draft) => Ok(draft),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(draft) => {
                let confidence = draft.confidence.unwrap_or(AI_CONFIDENCE);
                StageOutcome::generated(
                    FollowUpMessage {
                        subject: draft.subject,
                        message: draft.message,
                        reasoning: draft.reasoning,
                        key_points: draft.key_points,
                        next_steps: draft.next_steps,
                        strategy,
                    },
                    confidence,
                )
            }
            Err(e) => {
                debug!(error = %e, "Follow-up falling back to template");
                self.fallback(input, &e)
            }
        }
    }

    fn fallback(
        &self,
        input: &FollowUpContext,
        error: &StageError,
    ) -> StageOutcome<FollowUpMessage> {
        let creator = if input.creator_name.is_empty() {
            "Creator"
        } else {
            input.creator_name.as_str()
        };
        let brand = if input.brand_name.is_empty() {
            "Our Brand"
        } else {
            input.brand_name.as_str()
        };

        let message = format!(
            "Hi {creator},\n\nJust wanted to gently touch base regarding our previous message about \
             a potential collaboration with {brand}. It has been {days} days, and we wanted to see \
             if you had any thoughts or questions.\n\nWe understand you're busy, so no pressure at \
             all. If you're interested, we'd love to hear from you. If not, we appreciate your time \
             and wish you the best!\n\nSincerely,\nThe {brand} Team",
            creator = creator,
            brand = brand,
            days = input.days_since_last_contact,
        );

        StageOutcome::fallback(
            FollowUpMessage {
                subject: format!("Following Up: {} & {} Collaboration", brand, creator),
                message,
                reasoning: "Standard follow-up template".to_string(),
                key_points: vec!["Gentle reminder".to_string(), "Respectful tone".to_string()],
                next_steps: vec!["Monitor for a response".to_string()],
                strategy: FollowUpStrategy::for_days(input.days_since_last_contact),
            },
            FALLBACK_CONFIDENCE,
            error.to_string(),
        )
    }
}
