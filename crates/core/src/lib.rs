pub mod advisor;
pub mod calls;
pub mod config;
pub mod conversation;
pub mod generative;
pub mod metrics;
pub mod pipeline;
pub mod rate_limiter;
pub mod telephony;
pub mod testing;

pub use advisor::{
    FollowUpAdvisor, FollowUpContext, FollowUpMessage, NegotiationAdvisor, NegotiationContext,
    NegotiationStrategy, QueryAnalysis, QueryAnalyzer, CreatorQuery,
};
pub use calls::{
    CallError, CallLifecycleManager, CallPhase, CallSession, CallSnapshot, CallsConfig,
    MergeReport, NotificationBus, Observer, Subscription,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use conversation::{
    ConversationError, ConversationMessage, ConversationStore, MessageKind,
    SqliteConversationStore,
};
pub use generative::{
    create_generative_client, GenerativeClient, GenerativeConfig, GenerativeError,
    GenerativeGateway, GenerativeProvider,
};
pub use pipeline::{
    BusinessRequirements, CampaignPlan, CampaignWorkflow, CreatorMatch, CreatorPool,
    GenerationMethod, PipelineConfig, PipelineStage, StageError, StageOutcome, WorkflowResult,
};
pub use rate_limiter::{AdmissionError, RateLimitConfig, RateLimitStatus, SlidingWindowLimiter};
pub use telephony::{
    CallArtifacts, DisabledTelephony, HttpTelephonyClient, PlacedCall, TelephonyClient,
    TelephonyConfig, TelephonyError, TranscriptTurn,
};
