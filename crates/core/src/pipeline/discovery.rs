//! Creator discovery: select candidates from the pool for a campaign plan.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{CampaignPlan, Creator, CreatorPool, PipelineStage, StageError, StageOutcome};
use crate::generative::GenerativeGateway;

const AI_CONFIDENCE: f32 = 0.8;
const FALLBACK_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You select social media creators for a campaign. From the \
creator list, pick those that fit the campaign platforms, niches and locations. Reply with \
a JSON object: {\"creator_ids\": [\"...\"]}. Only use ids from the list.";

/// Picks campaign candidates from a [`CreatorPool`].
pub struct CreatorDiscovery {
    gateway: GenerativeGateway,
    pool: Arc<CreatorPool>,
    wait_budget: Duration,
}

#[derive(Debug, Deserialize)]
struct Selection {
    #[serde(default)]
    creator_ids: Vec<String>,
}

impl CreatorDiscovery {
    pub fn new(gateway: GenerativeGateway, pool: Arc<CreatorPool>, wait_budget: Duration) -> Self {
        Self {
            gateway,
            pool,
            wait_budget,
        }
    }

    fn build_prompt(&self, plan: &CampaignPlan) -> String {
        let mut prompt = format!(
            "Campaign: {}\nPlatforms: {}\nNiches: {}\nLocations: {}\nMinimum followers: {}\n\nCreators:\n",
            plan.title,
            plan.platforms.join(", "),
            plan.niches.join(", "),
            plan.locations.join(", "),
            plan.min_followers,
        );
        for creator in self.pool.creators() {
            prompt.push_str(&format!(
                "- {} | {} | {} | {} followers | {} | {}\n",
                creator.id,
                creator.platform,
                creator.niches.join("/"),
                creator.followers,
                creator.location,
                creator.bio,
            ));
        }
        prompt
    }

    fn resolve(&self, selection: Selection) -> Result<Vec<Creator>, StageError> {
        if selection.creator_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut picked: Vec<Creator> = Vec::new();
        for id in &selection.creator_ids {
            match self.pool.get(id) {
                Some(creator) if !picked.iter().any(|c| c.id == creator.id) => {
                    picked.push(creator.clone())
                }
                Some(_) => {}
                None => debug!(creator_id = %id, "Ignoring unknown creator id"),
            }
        }

        if picked.is_empty() {
            return Err(StageError::Invalid(
                "no selected creator id exists in the pool".to_string(),
            ));
        }
        Ok(picked)
    }
}

/// Deterministic filter: platform match and niche overlap.
pub fn matching_creators(pool: &CreatorPool, plan: &CampaignPlan) -> Vec<Creator> {
    let niches: Vec<String> = plan.niches.iter().map(|n| n.to_lowercase()).collect();

    pool.creators()
        .iter()
        .filter(|creator| plan.platforms.is_empty() || plan.targets_platform(&creator.platform))
        .filter(|creator| {
            if niches.is_empty() {
                return true;
            }
            let bio = creator.bio.to_lowercase();
            creator
                .niches
                .iter()
                .any(|n| niches.contains(&n.to_lowercase()))
                || niches.iter().any(|n| bio.contains(n.as_str()))
        })
        .cloned()
        .collect()
}

#[async_trait]
impl PipelineStage for CreatorDiscovery {
    type Input = CampaignPlan;
    type Output = Vec<Creator>;

    fn name(&self) -> &'static str {
        "discovery"
    }

    async fn run(&self, input: &CampaignPlan) -> StageOutcome<Vec<Creator>> {
        let request = self.gateway.request(SYSTEM_PROMPT, self.build_prompt(input));

        let result = match self
            .gateway
            .generate_json::<Selection>(self.name(), request, self.wait_budget)
            .await
        {
            Ok(selection) => self.resolve(selection),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(creators) => {
                info!(count = creators.len(), "Creators selected");
                StageOutcome::generated(creators, AI_CONFIDENCE)
            }
            Err(e) => {
                debug!(error = %e, "Discovery falling back to pool filter");
                self.fallback(input, &e)
            }
        }
    }

    fn fallback(&self, input: &CampaignPlan, error: &StageError) -> StageOutcome<Vec<Creator>> {
        StageOutcome::fallback(
            matching_creators(&self.pool, input),
            FALLBACK_CONFIDENCE,
            error.to_string(),
        )
    }
}
