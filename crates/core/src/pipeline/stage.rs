//! The stage contract shared by every generative step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generative::GenerativeError;

/// How a stage produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    AiGenerated,
    AlgorithmicFallback,
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::AiGenerated => "ai_generated",
            GenerationMethod::AlgorithmicFallback => "algorithmic_fallback",
        }
    }
}

/// Why a stage fell back.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Generative(#[from] GenerativeError),

    /// The model answered, but the answer was unusable.
    #[error("invalid generated result: {0}")]
    Invalid(String),

    #[error("stage panicked")]
    Panicked,
}

/// Result of one stage run.
///
/// A stage always yields a value: either the generated one or a deterministic
/// fallback computed locally. Serialized with a `method` tag of
/// `ai_generated` or `algorithmic_fallback`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method")]
pub enum StageOutcome<T> {
    #[serde(rename = "ai_generated")]
    Generated { value: T, confidence: f32 },
    #[serde(rename = "algorithmic_fallback")]
    Fallback {
        value: T,
        confidence: f32,
        reason: String,
    },
}

impl<T> StageOutcome<T> {
    pub fn generated(value: T, confidence: f32) -> Self {
        StageOutcome::Generated {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn fallback(value: T, confidence: f32, reason: impl Into<String>) -> Self {
        StageOutcome::Fallback {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    pub fn method(&self) -> GenerationMethod {
        match self {
            StageOutcome::Generated { .. } => GenerationMethod::AiGenerated,
            StageOutcome::Fallback { .. } => GenerationMethod::AlgorithmicFallback,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            StageOutcome::Generated { confidence, .. }
            | StageOutcome::Fallback { confidence, .. } => *confidence,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Generated { value, .. } | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Generated { value, .. } | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Fallback { reason, .. } => Some(reason),
            StageOutcome::Generated { .. } => None,
        }
    }
}

/// One step of a generative workflow.
///
/// `run` must never fail: every error (admission denial, transport failure,
/// malformed reply) ends in [`fallback`](PipelineStage::fallback).
#[async_trait]
pub trait PipelineStage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Stage name for logging, metrics and admission labels.
    fn name(&self) -> &'static str;

    async fn run(&self, input: &Self::Input) -> StageOutcome<Self::Output>;

    /// Deterministic result computed without the generative capability.
    fn fallback(&self, input: &Self::Input, error: &StageError) -> StageOutcome<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_method_tag() {
        let generated = StageOutcome::generated(vec![1, 2], 0.85);
        let json = serde_json::to_value(&generated).unwrap();
        assert_eq!(json["method"], "ai_generated");
        assert_eq!(json["value"], serde_json::json!([1, 2]));

        let fallback = StageOutcome::fallback("plan", 0.6, "Not configured");
        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(json["method"], "algorithmic_fallback");
        assert_eq!(json["reason"], "Not configured");
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(StageOutcome::generated((), 1.7).confidence(), 1.0);
        assert_eq!(StageOutcome::fallback((), -0.2, "x").confidence(), 0.0);
    }

    #[test]
    fn test_accessors() {
        let outcome = StageOutcome::fallback(5, 0.4, "timeout");
        assert!(outcome.is_fallback());
        assert_eq!(outcome.method(), GenerationMethod::AlgorithmicFallback);
        assert_eq!(outcome.fallback_reason(), Some("timeout"));
        assert_eq!(*outcome.value(), 5);
        assert_eq!(outcome.into_value(), 5);
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError::from(GenerativeError::NotConfigured);
        assert_eq!(err.to_string(), "Generative capability not configured");
        assert_eq!(
            StageError::Invalid("missing title".to_string()).to_string(),
            "invalid generated result: missing title"
        );
    }
}
