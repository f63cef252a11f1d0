//! Campaign workflow: four generative stages with deterministic fallbacks.
//!
//! Each stage asks the shared [`GenerativeGateway`](crate::generative::GenerativeGateway)
//! for a result and degrades to a locally computed one on any failure. The
//! [`CampaignWorkflow`] runs them in order and never fails.

mod campaign;
mod config;
mod discovery;
mod dispatch;
mod pool;
mod scoring;
mod stage;
mod types;
mod workflow;

pub use campaign::{fallback_plan, CampaignSynthesizer};
pub use config::PipelineConfig;
pub use discovery::{matching_creators, CreatorDiscovery};
pub use dispatch::{select_recipients, template_message, OutreachDispatcher, BRAND_SENDER};
pub use pool::CreatorPool;
pub use scoring::{algorithmic_match, CandidateScorer};
pub use stage::{GenerationMethod, PipelineStage, StageError, StageOutcome};
pub use types::{
    BusinessRequirements, CampaignPlan, Creator, CreatorMatch, DispatchInput, DispatchSummary,
    EstimatedPerformance, FitAnalysis, OutreachDraft, OutreachMessage, RecommendedAction,
    ScoringInput,
    StageReport, WorkflowInsights, WorkflowResult,
};
pub use workflow::{CampaignWorkflow, HALTED_CONFIDENCE};
