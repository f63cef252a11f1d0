//! Campaign synthesis: business requirements to campaign plan.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{BusinessRequirements, CampaignPlan, PipelineStage, StageError, StageOutcome};
use crate::generative::GenerativeGateway;

const DEFAULT_BUDGET_MIN: f64 = 10_000.0;
const DEFAULT_BUDGET_MAX: f64 = 50_000.0;
const DEFAULT_AI_CONFIDENCE: f32 = 0.85;
const FALLBACK_CONFIDENCE: f32 = 0.60;

const SYSTEM_PROMPT: &str = "You are an influencer marketing strategist. Design a campaign \
for the brief you are given. Reply with a single JSON object with the keys: title, brand, \
description, brief, platforms, min_followers, niches, locations, deliverables, budget_min, \
budget_max, start_date, end_date, application_deadline (dates as YYYY-MM-DD), insights, \
confidence (0.0-1.0).";

/// Turns business requirements into a campaign plan.
pub struct CampaignSynthesizer {
    gateway: GenerativeGateway,
    wait_budget: Duration,
}

impl CampaignSynthesizer {
    pub fn new(gateway: GenerativeGateway, wait_budget: Duration) -> Self {
        Self {
            gateway,
            wait_budget,
        }
    }

    fn build_prompt(requirements: &BusinessRequirements, today: NaiveDate) -> String {
        let mut prompt = format!(
            "Company: {}\nIndustry: {}\nObjective: {}\nTarget audience: {}\n",
            requirements.company_name,
            requirements.industry,
            requirements.campaign_objective,
            requirements.target_audience,
        );
        if let Some(ref product) = requirements.product_description {
            prompt.push_str(&format!("Product: {}\n", product));
        }
        prompt.push_str(&format!(
            "Budget: {} - {}\n",
            requirements.budget_min.unwrap_or(DEFAULT_BUDGET_MIN),
            requirements.budget_max.unwrap_or(DEFAULT_BUDGET_MAX)
        ));
        if !requirements.preferred_platforms.is_empty() {
            prompt.push_str(&format!(
                "Preferred platforms: {}\n",
                requirements.preferred_platforms.join(", ")
            ));
        }
        if !requirements.locations.is_empty() {
            prompt.push_str(&format!("Locations: {}\n", requirements.locations.join(", ")));
        }
        if let Some(ref special) = requirements.special_requirements {
            prompt.push_str(&format!("Special requirements: {}\n", special));
        }
        prompt.push_str(&format!("Today is {}.", today));
        prompt
    }
}

/// Template plan built from the raw requirements.
pub fn fallback_plan(requirements: &BusinessRequirements, today: NaiveDate) -> CampaignPlan {
    let company = if requirements.company_name.trim().is_empty() {
        "Brand".to_string()
    } else {
        requirements.company_name.trim().to_string()
    };

    let objective_word = requirements
        .campaign_objective
        .split_whitespace()
        .next()
        .map(capitalize)
        .unwrap_or_else(|| "Influencer".to_string());

    let platforms: Vec<String> = if requirements.preferred_platforms.is_empty() {
        vec!["instagram".to_string(), "youtube".to_string()]
    } else {
        requirements
            .preferred_platforms
            .iter()
            .take(2)
            .map(|p| p.to_lowercase())
            .collect()
    };

    let mut niches = Vec::new();
    let industry = requirements.industry.trim().to_lowercase();
    if !industry.is_empty() {
        niches.push(industry);
    }
    niches.push("lifestyle".to_string());

    let locations = if requirements.locations.is_empty() {
        vec!["India".to_string()]
    } else {
        requirements.locations.clone()
    };

    let deliverables = platforms.iter().flat_map(|p| deliverables_for(p)).collect();

    let start_date = today + Days::new(7);
    let end_date = start_date + Days::new(30);
    let application_deadline = start_date - Days::new(3);

    let objective = if requirements.campaign_objective.trim().is_empty() {
        "brand awareness".to_string()
    } else {
        requirements.campaign_objective.trim().to_string()
    };
    let audience = if requirements.target_audience.trim().is_empty() {
        "a broad audience".to_string()
    } else {
        requirements.target_audience.trim().to_string()
    };

    CampaignPlan {
        title: format!("{} {} Campaign", company, objective_word),
        brand: company.clone(),
        description: format!(
            "{} campaign for {} focused on {}, reaching {}.",
            objective_word, company, objective, audience
        ),
        brief: requirements
            .product_description
            .clone()
            .unwrap_or_else(|| objective.clone()),
        platforms,
        min_followers: 10_000,
        niches,
        locations,
        deliverables,
        budget_min: requirements.budget_min.unwrap_or(DEFAULT_BUDGET_MIN) * 0.8,
        budget_max: requirements.budget_max.unwrap_or(DEFAULT_BUDGET_MAX) * 0.9,
        start_date,
        end_date,
        application_deadline,
        insights: vec![
            "Plan generated from the requirements template; review budget and timeline before publishing.".to_string(),
        ],
    }
}

fn deliverables_for(platform: &str) -> Vec<String> {
    match platform {
        "instagram" => vec!["1 Instagram Reel".to_string(), "2 Instagram Stories".to_string()],
        "youtube" => vec!["1 YouTube integration (60-90s)".to_string()],
        "tiktok" => vec!["1 TikTok video".to_string()],
        other => vec![format!("1 {} post", capitalize(other))],
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Raw campaign as returned by the model. Everything is optional so partial
/// answers can be completed from the template.
#[derive(Debug, Deserialize)]
struct CampaignDraft {
    title: Option<String>,
    brand: Option<String>,
    description: Option<String>,
    brief: Option<String>,
    #[serde(default)]
    platforms: Vec<String>,
    min_followers: Option<u64>,
    #[serde(default)]
    niches: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    deliverables: Vec<String>,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    application_deadline: Option<NaiveDate>,
    #[serde(default)]
    insights: Vec<String>,
    confidence: Option<f32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CampaignDraft {
    /// Validate the required keys and fill the rest from `template`.
    fn into_plan(self, template: CampaignPlan) -> Result<(CampaignPlan, f32), StageError> {
        let title =
            non_empty(self.title).ok_or_else(|| StageError::Invalid("missing title".into()))?;
        let brand =
            non_empty(self.brand).ok_or_else(|| StageError::Invalid("missing brand".into()))?;
        let description = non_empty(self.description)
            .ok_or_else(|| StageError::Invalid("missing description".into()))?;

        let platforms: Vec<String> = self
            .platforms
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if platforms.is_empty() {
            return Err(StageError::Invalid("missing platforms".into()));
        }

        let (budget_min, budget_max) = match (self.budget_min, self.budget_max) {
            (Some(min), Some(max)) if min >= 0.0 && min <= max => (min, max),
            _ => (template.budget_min, template.budget_max),
        };

        let (start_date, end_date, application_deadline) =
            match (self.start_date, self.end_date, self.application_deadline) {
                (Some(start), Some(end), Some(deadline)) if start < end && deadline <= start => {
                    (start, end, deadline)
                }
                _ => (
                    template.start_date,
                    template.end_date,
                    template.application_deadline,
                ),
            };

        let or_template = |values: Vec<String>, fallback: Vec<String>| {
            if values.is_empty() {
                fallback
            } else {
                values
            }
        };

        let plan = CampaignPlan {
            title,
            brand,
            description,
            brief: non_empty(self.brief).unwrap_or(template.brief),
            platforms,
            min_followers: self.min_followers.unwrap_or(template.min_followers),
            niches: or_template(self.niches, template.niches),
            locations: or_template(self.locations, template.locations),
            deliverables: or_template(self.deliverables, template.deliverables),
            budget_min,
            budget_max,
            start_date,
            end_date,
            application_deadline,
            insights: self.insights,
        };

        Ok((plan, self.confidence.unwrap_or(DEFAULT_AI_CONFIDENCE)))
    }
}

#[async_trait]
impl PipelineStage for CampaignSynthesizer {
    type Input = BusinessRequirements;
    type Output = CampaignPlan;

    fn name(&self) -> &'static str {
        "campaign"
    }

    async fn run(&self, input: &BusinessRequirements) -> StageOutcome<CampaignPlan> {
        let today = Utc::now().date_naive();
        let request = self
            .gateway
            .request(SYSTEM_PROMPT, Self::build_prompt(input, today));

        let result = match self
            .gateway
            .generate_json::<CampaignDraft>(self.name(), request, self.wait_budget)
            .await
        {
            Ok(draft) => draft.into_plan(fallback_plan(input, today)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok((plan, confidence)) => {
                info!(title = %plan.title, "Campaign plan generated");
                StageOutcome::generated(plan, confidence)
            }
            Err(e) => {
                debug!(error = %e, "Campaign synthesis falling back to template");
                self.fallback(input, &e)
            }
        }
    }

    fn fallback(
        &self,
        input: &BusinessRequirements,
        error: &StageError,
    ) -> StageOutcome<CampaignPlan> {
        let plan = fallback_plan(input, Utc::now().date_naive());
        StageOutcome::fallback(plan, FALLBACK_CONFIDENCE, error.to_string())
    }
}
