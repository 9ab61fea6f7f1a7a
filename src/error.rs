//! Error types for a triage run.
//!
//! Run-level errors abort before or during a run. Per-item failures are
//! recorded as [`FailureRecord`]s and never stop the run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a whole triage run.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Missing API keys or models. Raised before any dispatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The image collaborator failed for an item.
    #[error("image source failed for item {item_id}: {message}")]
    ImageSource { item_id: String, message: String },
}

/// Why a single item produced no evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureRecord {
    /// The item had no images to submit. No quota slot was spent.
    #[error("no images available: {message}")]
    NoImages { message: String },

    /// The provider signalled quota exhaustion. The slot was spent.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// Any other provider failure.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// Not dispatched because the run stopped after a rate limit.
    #[error("skipped: {message}")]
    Skipped { message: String },
}

impl FailureRecord {
    /// Classify a provider error message.
    ///
    /// A `429` status or the word "quota" anywhere in the text counts as
    /// rate limiting.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("429") || message.to_lowercase().contains("quota") {
            FailureRecord::RateLimited { message }
        } else {
            FailureRecord::Provider { message }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FailureRecord::RateLimited { .. })
    }

    /// Short machine-friendly label.
    pub fn label(&self) -> &'static str {
        match self {
            FailureRecord::NoImages { .. } => "no_images",
            FailureRecord::RateLimited { .. } => "rate_limited",
            FailureRecord::Provider { .. } => "provider",
            FailureRecord::Skipped { .. } => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_code() {
        let failure = FailureRecord::from_provider_message("Gemini API error 429 Too Many Requests");
        assert!(failure.is_rate_limited());
    }

    #[test]
    fn test_classify_quota_case_insensitive() {
        let failure = FailureRecord::from_provider_message("Resource has been exhausted (check QUOTA).");
        assert!(failure.is_rate_limited());
    }

    #[test]
    fn test_classify_other_error() {
        let failure = FailureRecord::from_provider_message("Cannot connect to Gemini API");
        assert_eq!(
            failure,
            FailureRecord::Provider {
                message: "Cannot connect to Gemini API".to_string()
            }
        );
        assert_eq!(failure.label(), "provider");
    }

    #[test]
    fn test_failure_serializes_with_kind_tag() {
        let failure = FailureRecord::NoImages {
            message: "empty".to_string(),
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"no_images\""));
    }
}
