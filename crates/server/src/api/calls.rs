//! Call lifecycle and conversation handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use creatorflow_core::{CallError, CallSession, CallSnapshot, ConversationMessage, MergeReport};

use super::handlers::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Request body for placing a call
#[derive(Debug, Deserialize)]
pub struct InitiateCallBody {
    /// Conversation record the call belongs to
    pub context_id: String,
    /// Number or address to call
    pub target: String,
    /// Opening message for the call agent
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Request body for a manual artifact fetch
#[derive(Debug, Default, Deserialize)]
pub struct FetchArtifactsBody {
    /// Call to fetch. Defaults to the active call.
    pub call_sid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub context_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub messages: Vec<ConversationMessage>,
}

fn call_error(e: CallError) -> ApiError {
    let status = match e {
        CallError::Placement(_) | CallError::Fetch(_) => StatusCode::BAD_GATEWAY,
        CallError::Superseded => StatusCode::CONFLICT,
        CallError::NoActiveCall => StatusCode::NOT_FOUND,
        CallError::UnknownContext(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CallError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Place a call and start tracking it. Any active call is superseded.
pub async fn initiate_call(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InitiateCallBody>,
) -> Result<(StatusCode, Json<CallSession>), ApiError> {
    if body.context_id.trim().is_empty() || body.target.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("context_id and target are required")),
        ));
    }

    state
        .calls()
        .initiate(&body.context_id, &body.target, &body.message, body.metadata)
        .await
        .map(|session| (StatusCode::CREATED, Json(session)))
        .map_err(call_error)
}

pub async fn current_call(State(state): State<Arc<AppState>>) -> Json<CallSnapshot> {
    Json(state.calls().snapshot())
}

pub async fn fetch_artifacts(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FetchArtifactsBody>>,
) -> Result<Json<MergeReport>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    state
        .calls()
        .manually_fetch_artifacts(body.call_sid.as_deref())
        .await
        .map(Json)
        .map_err(call_error)
}

/// Get a conversation record. Unknown contexts read as empty.
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(context_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let store = state.conversations();
    let result = store
        .list_messages(&context_id)
        .and_then(|messages| Ok((messages, store.status(&context_id)?)));

    match result {
        Ok((messages, status)) => Ok(Json(ConversationResponse {
            context_id,
            status,
            messages,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )),
    }
}
