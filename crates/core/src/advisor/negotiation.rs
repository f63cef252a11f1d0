use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::generative::GenerativeGateway;
use crate::pipeline::{PipelineStage, StageError, StageOutcome};

const DEFAULT_BASE_OFFER: f64 = 10_000.0;
const AI_CONFIDENCE: f32 = 0.8;
const FALLBACK_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You are a negotiation agent for influencer marketing deals. \
Give stage-aware guidance. Reply with a JSON object: {\"current_phase\": \"initial_interest\" \
| \"price_discussion\" | \"terms_negotiation\" | \"closing\", \"suggested_response\": \"...\", \
\"negotiation_tactics\": [...], \"recommended_offer\": {\"amount\": number, \"reasoning\": \
\"...\"}, \"next_steps\": [...]}.";

/// Where an ongoing negotiation stands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NegotiationContext {
    pub creator_name: String,
    #[serde(default)]
    pub creator_platform: String,
    pub brand_name: String,
    /// Outreach status, e.g. `interested` or `negotiating`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub campaign_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_offer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationPhase {
    InitialInterest,
    PriceDiscussion,
    TermsNegotiation,
    Closing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedOffer {
    pub amount: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationStrategy {
    pub current_phase: NegotiationPhase,
    pub suggested_response: String,
    #[serde(default)]
    pub negotiation_tactics: Vec<String>,
    pub recommended_offer: RecommendedOffer,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Suggests the next move in a negotiation with a creator.
pub struct NegotiationAdvisor {
    gateway: GenerativeGateway,
    wait_budget: Duration,
}

impl NegotiationAdvisor {
    pub fn new(gateway: GenerativeGateway, wait_budget: Duration) -> Self {
        Self {
            gateway,
            wait_budget,
        }
    }

    pub async fn strategy(
        &self,
        context: &NegotiationContext,
    ) -> StageOutcome<NegotiationStrategy> {
        self.run(context).await
    }

    fn build_prompt(context: &NegotiationContext) -> String {
        let guidance = match context.status.as_str() {
            "interested" => "Interested stage: build excitement and present value.",
            "negotiating" => "Negotiating stage: address concerns and find a win-win.",
            _ => "General stage: keep a professional and positive tone.",
        };
        let campaign: String = context.campaign_context.chars().take(150).collect();
        let offer = context
            .current_offer
            .map(|o| format!("{:.0}", o))
            .unwrap_or_else(|| "not set".to_string());

        let mut prompt = format!(
            "Creator: {} ({})\nStatus: {}\nBrand: {}\nCampaign: {}\nCurrent offer: {}\n{}\n",
            context.creator_name,
            context.creator_platform,
            context.status,
            context.brand_name,
            campaign,
            offer,
            guidance,
        );
        match context.conversation_summary.as_deref() {
            Some(history) if !history.trim().is_empty() => {
                prompt.push_str(&format!(
                    "\nConversation so far:\n{}\nBuild on the previous exchanges.",
                    history
                ));
            }
            _ => prompt.push_str("\nThis is the start of the negotiation."),
        }
        prompt
    }
}

/// Offer recommended without the generative capability: 10% over the
/// current offer.
pub fn fallback_offer(current_offer: Option<f64>) -> f64 {
    let base = current_offer
        .filter(|o| *o > 0.0)
        .unwrap_or(DEFAULT_BASE_OFFER);
    (base * 1.1).round()
}

#[async_trait]
impl PipelineStage for NegotiationAdvisor {
    type Input = NegotiationContext;
    type Output = NegotiationStrategy;

    fn name(&self) -> &'static str {
        "negotiation"
    }

    async fn run(&self, input: &NegotiationContext) -> StageOutcome<NegotiationStrategy> {
        let request = self.gateway.request(SYSTEM_PROMPT, Self::build_prompt(input));
        let result: Result<NegotiationStrategy, StageError> = self
            .gateway
            .generate_json(self.name(), request, self.wait_budget)
            .await
            .map_err(StageError::from)
            .and_then(|strategy: NegotiationStrategy| {
                if strategy.suggested_response.trim().is_empty() {
                    Err(StageError::Invalid("empty suggested response".to_string()))
                } else {
                    Ok(strategy)
                }
            });

        match result {
            Ok(strategy) => StageOutcome::generated(strategy, AI_CONFIDENCE),
            Err(e) => {
                debug!(error = %e, "Negotiation strategy falling back");
                self.fallback(input, &e)
            }
        }
    }

    fn fallback(
        &self,
        input: &NegotiationContext,
        error: &StageError,
    ) -> StageOutcome<NegotiationStrategy> {
        let creator = if input.creator_name.is_empty() {
            "there"
        } else {
            input.creator_name.as_str()
        };
        let brand = if input.brand_name.is_empty() {
            "our brand"
        } else {
            input.brand_name.as_str()
        };

        let strategy = NegotiationStrategy {
            current_phase: NegotiationPhase::InitialInterest,
            suggested_response: format!(
                "Hi {}! Thanks for your interest in {}. Let's discuss a collaboration!",
                creator, brand
            ),
            negotiation_tactics: vec![
                "Build rapport".to_string(),
                "Emphasize mutual value".to_string(),
            ],
            recommended_offer: RecommendedOffer {
                amount: fallback_offer(input.current_offer),
                reasoning: "10% above the current offer or the default base value".to_string(),
            },
            next_steps: vec![
                "Schedule a call".to_string(),
                "Prepare the campaign brief".to_string(),
            ],
        };
        StageOutcome::fallback(strategy, FALLBACK_CONFIDENCE, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockGenerativeClient};
    use std::sync::Arc;

    fn context() -> NegotiationContext {
        NegotiationContext {
            creator_name: "Neha Kapoor".to_string(),
            creator_platform: "instagram".to_string(),
            brand_name: "Glow Naturals".to_string(),
            status: "negotiating".to_string(),
            current_offer: Some(12_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_offer() {
        assert_eq!(fallback_offer(Some(12_000.0)), 13_200.0);
        assert_eq!(fallback_offer(None), 11_000.0);
        assert_eq!(fallback_offer(Some(0.0)), 11_000.0);
    }

    #[tokio::test]
    async fn test_without_generative_uses_fallback() {
        let advisor = NegotiationAdvisor::new(fixtures::disabled_gateway(), Duration::ZERO);
        let outcome = advisor.strategy(&context()).await;

        assert!(outcome.is_fallback());
        let strategy = outcome.value();
        assert_eq!(strategy.current_phase, NegotiationPhase::InitialInterest);
        assert_eq!(strategy.recommended_offer.amount, 13_200.0);
        assert!(strategy.suggested_response.contains("Neha Kapoor"));
    }

    #[tokio::test]
    async fn test_generated_strategy() {
        let client = Arc::new(MockGenerativeClient::new());
        client
            .push_response(
                r#"{"current_phase": "price_discussion", "suggested_response": "Happy to meet at 14k.",
                    "negotiation_tactics": ["anchor"], "recommended_offer": {"amount": 14000, "reasoning": "market rate"},
                    "next_steps": ["send contract"]}"#,
            )
            .await;
        let advisor = NegotiationAdvisor::new(fixtures::gateway(client.clone()), Duration::ZERO);

        let outcome = advisor.strategy(&context()).await;
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.value().current_phase, NegotiationPhase::PriceDiscussion);
        assert_eq!(outcome.value().recommended_offer.amount, 14_000.0);

        let prompt = &client.recorded_requests().await[0].prompt;
        assert!(prompt.contains("Negotiating stage"));
    }

    #[tokio::test]
    async fn test_missing_offer_falls_back() {
        let client = Arc::new(MockGenerativeClient::new());
        client
            .push_response(r#"{"current_phase": "closing", "suggested_response": "Deal?"}"#)
            .await;
        let advisor = NegotiationAdvisor::new(fixtures::gateway(client), Duration::ZERO);

        assert!(advisor.strategy(&context()).await.is_fallback());
    }
}
