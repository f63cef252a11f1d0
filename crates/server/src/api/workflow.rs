//! Campaign workflow and advisor handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use creatorflow_core::{
    advisor::{
        CreatorQuery, FollowUpContext, FollowUpMessage, NegotiationContext, NegotiationStrategy,
        QueryAnalysis,
    },
    pipeline::{Creator, OutreachDraft},
    BusinessRequirements, CampaignPlan, CreatorMatch, PipelineStage, StageOutcome,
    WorkflowResult,
};

use super::handlers::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

/// Run the four-stage campaign workflow.
///
/// Always answers with a full result: stages that cannot use the generative
/// capability report their deterministic output instead.
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BusinessRequirements>,
) -> Result<Json<WorkflowResult>, ApiError> {
    if body.company_name.trim().is_empty() {
        return Err(bad_request("company_name is required"));
    }

    info!(company = %body.company_name, "Workflow requested");
    Ok(Json(state.workflow().run(body).await))
}

/// Request to score one creator against a plan.
#[derive(Debug, Deserialize)]
pub struct ScoreCreatorRequest {
    pub plan: CampaignPlan,
    pub creator: Creator,
}

/// Request to compose one outreach message.
#[derive(Debug, Deserialize)]
pub struct OutreachDraftRequest {
    pub plan: CampaignPlan,
    pub creator_match: CreatorMatch,
    #[serde(default)]
    pub personalized: bool,
}

/// Synthesize a campaign plan on its own.
pub async fn synthesize_campaign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BusinessRequirements>,
) -> Result<Json<StageOutcome<CampaignPlan>>, ApiError> {
    if body.company_name.trim().is_empty() {
        return Err(bad_request("company_name is required"));
    }
    Ok(Json(state.campaign().run(&body).await))
}

pub async fn score_creator(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScoreCreatorRequest>,
) -> Result<Json<StageOutcome<CreatorMatch>>, ApiError> {
    if body.creator.id.trim().is_empty() {
        return Err(bad_request("creator.id is required"));
    }
    Ok(Json(state.scorer().score_creator(&body.plan, &body.creator).await))
}

/// Compose one outreach message. Nothing is recorded.
pub async fn draft_outreach(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OutreachDraftRequest>,
) -> Result<Json<StageOutcome<OutreachDraft>>, ApiError> {
    if body.creator_match.creator.name.trim().is_empty() {
        return Err(bad_request("creator_match.creator.name is required"));
    }
    Ok(Json(
        state
            .outreach()
            .draft(&body.plan, &body.creator_match, body.personalized)
            .await,
    ))
}

pub async fn negotiation_strategy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NegotiationContext>,
) -> Result<Json<StageOutcome<NegotiationStrategy>>, ApiError> {
    if body.creator_name.trim().is_empty() {
        return Err(bad_request("creator_name is required"));
    }
    Ok(Json(state.negotiation().strategy(&body).await))
}

pub async fn follow_up_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FollowUpContext>,
) -> Result<Json<StageOutcome<FollowUpMessage>>, ApiError> {
    if body.creator_name.trim().is_empty() {
        return Err(bad_request("creator_name is required"));
    }
    Ok(Json(state.follow_up().compose(&body).await))
}

pub async fn analyze_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatorQuery>,
) -> Result<Json<StageOutcome<QueryAnalysis>>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(bad_request("query is required"));
    }
    Ok(Json(state.query_analyzer().analyze(&body).await))
}
