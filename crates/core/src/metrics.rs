//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Admission control (waits, denials)
//! - Generative capability (requests, latency, tokens)
//! - Pipeline (stage outcomes, workflow runs)
//! - Call lifecycle (placements, poll ticks, outcomes, artifact merges)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Admission control
// =============================================================================

/// Admissions that had to wait for a free slot, by caller.
pub static ADMISSION_WAITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "creatorflow_admission_waits_total",
            "Admission checks that found the window full",
        ),
        &["caller"],
    )
    .unwrap()
});

/// Admissions refused because the wait exceeded the caller's budget.
pub static ADMISSION_DENIALS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "creatorflow_admission_denials_total",
            "Admissions denied because the wait exceeded the caller budget",
        ),
        &["caller"],
    )
    .unwrap()
});

// =============================================================================
// Generative capability
// =============================================================================

/// Generative requests by stage and outcome.
pub static GENERATIVE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "creatorflow_generative_requests_total",
            "Generative requests by stage and outcome",
        ),
        &["stage", "outcome"], // "success", "http", "api", "malformed", "timeout", ...
    )
    .unwrap()
});

/// Generative request latency in seconds.
pub static GENERATIVE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "creatorflow_generative_duration_seconds",
            "Latency of generative completions",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["stage"],
    )
    .unwrap()
});

/// Generative tokens used.
pub static GENERATIVE_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_generative_tokens_total", "Total generative tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Pipeline
// =============================================================================

/// Stage results by generation method.
pub static STAGE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "creatorflow_stage_outcomes_total",
            "Pipeline stage results by generation method",
        ),
        &["stage", "method"], // method: "ai_generated", "algorithmic_fallback"
    )
    .unwrap()
});

/// Workflow duration in seconds.
pub static WORKFLOW_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "creatorflow_workflow_duration_seconds",
            "Duration of complete campaign workflow runs",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0]),
        &["result"], // "completed", "halted"
    )
    .unwrap()
});

// =============================================================================
// Call lifecycle
// =============================================================================

/// Call placements by result.
pub static CALLS_INITIATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_calls_initiated_total", "Call placement attempts"),
        &["result"], // "placed", "failed", "superseded"
    )
    .unwrap()
});

/// Poll ticks by classified remote status.
pub static POLL_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_poll_ticks_total", "Call status poll ticks"),
        &["status"], // "completed", "pending", "failed", "error", "stale"
    )
    .unwrap()
});

/// Terminal call outcomes.
pub static CALL_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_call_outcomes_total", "Terminal call outcomes"),
        &["outcome"], // "completed", "failed", "timeout", "fetch_failed", "superseded"
    )
    .unwrap()
});

/// Artifact merges into conversation records.
pub static ARTIFACT_MERGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "creatorflow_artifact_merges_total",
            "Call artifact merges into conversation records",
        ),
        &["result"], // "merged", "replaced", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Admission
        Box::new(ADMISSION_WAITS.clone()),
        Box::new(ADMISSION_DENIALS.clone()),
        // Generative
        Box::new(GENERATIVE_REQUESTS.clone()),
        Box::new(GENERATIVE_DURATION.clone()),
        Box::new(GENERATIVE_TOKENS.clone()),
        // Pipeline
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(WORKFLOW_DURATION.clone()),
        // Calls
        Box::new(CALLS_INITIATED.clone()),
        Box::new(POLL_TICKS.clone()),
        Box::new(CALL_OUTCOMES.clone()),
        Box::new(ARTIFACT_MERGES.clone()),
    ]
}
