//! Standalone generators used outside the campaign workflow.
//!
//! Each advisor is a [`PipelineStage`](crate::pipeline::PipelineStage): it
//! asks the shared gateway first and falls back to a deterministic answer.

mod follow_up;
mod negotiation;
mod query;

pub use follow_up::{FollowUpAdvisor, FollowUpContext, FollowUpMessage, FollowUpStrategy};
pub use negotiation::{
    fallback_offer, NegotiationAdvisor, NegotiationContext, NegotiationPhase, NegotiationStrategy,
    RecommendedOffer,
};
pub use query::{
    classify_query, detect_platforms, CreatorQuery, ExtractedCriteria, QueryAnalysis,
    QueryAnalyzer, QueryType,
};
