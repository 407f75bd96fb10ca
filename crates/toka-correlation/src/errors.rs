//! Error types for the correlation engine (§4.6, §7).

use thiserror::Error;

/// Failure modes specific to grouping and LLM-assisted suppression.
///
/// None of these abort an audit on their own (§7 "partial failure
/// tolerance"): the engine always falls back to the pre-LLM group when an
/// assessment call fails, and records the failure rather than propagating
/// it. This type exists so callers that do want to observe a failure (e.g.
/// a test, or a future strict mode) have something concrete to match on.
#[derive(Debug, Clone, Error)]
pub enum CorrelationError {
    /// The LLM collaborator could not be reached, timed out, or returned a
    /// response that did not parse as a structured verdict.
    #[error("LLM assessment for group '{group_id}' failed: {reason}")]
    LlmAssessmentFailed {
        /// Correlation group identifier the assessment was requested for.
        group_id: String,
        /// Human-readable reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_group_id_and_reason() {
        let err = CorrelationError::LlmAssessmentFailed { group_id: "abc123".into(), reason: "timed out".into() };
        assert_eq!(err.to_string(), "LLM assessment for group 'abc123' failed: timed out");
    }
}
