use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{calls, handlers, middleware::metrics_middleware, workflow, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/rate-limit", get(handlers::get_rate_limit))
        // Campaign workflow
        .route("/workflow", post(workflow::run_workflow))
        // Individual stages
        .route("/campaign", post(workflow::synthesize_campaign))
        .route("/creators/score", post(workflow::score_creator))
        .route("/outreach/draft", post(workflow::draft_outreach))
        // Advisors
        .route("/advisor/negotiation", post(workflow::negotiation_strategy))
        .route("/advisor/follow-up", post(workflow::follow_up_message))
        .route("/advisor/query", post(workflow::analyze_query))
        // Calls
        .route("/calls", post(calls::initiate_call))
        .route("/calls/current", get(calls::current_call))
        .route("/calls/fetch", post(calls::fetch_artifacts))
        // Conversations
        .route("/conversations/{context_id}", get(calls::get_conversation))
        // Real-time updates
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
