//! Call lifecycle tracking.
//!
//! One call at a time is placed through the telephony service, polled until
//! it reaches a terminal status, and its recording and transcript are merged
//! into the conversation record it was placed for. Observers follow every
//! state change through the [`NotificationBus`].

mod bus;
mod config;
mod manager;
mod merge;
mod types;

pub use bus::{NotificationBus, Observer, Subscription};
pub use config::CallsConfig;
pub use manager::CallLifecycleManager;
pub use merge::{merge_call_artifacts, MergeOutcome, CALL_SENDER};
pub use types::{
    classify_status, CallError, CallPhase, CallSession, CallSnapshot, MergeReport, StatusClass,
};
