//! Optional LLM-assisted suppression pass over correlation groups (§4.6).
//!
//! Runs after grouping. Every group at or above `RunOptions.llm_severity_
//! threshold` is sent to the LLM collaborator with a bounded source
//! excerpt, the detecting tools and the default remediation; the
//! collaborator's verdict either raises the group's confidence or
//! suppresses it outright. A failed call is non-fatal: the group passes
//! through with whatever confidence grouping already gave it, and the
//! failure is recorded on its [`AssessmentOutcome`] rather than silently
//! dropped (§7 partial-failure tolerance).

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use toka_llm_gateway::{LlmGateway, LlmRequest};
use toka_types::{LlmAssessment, NormalizedFinding, RunOptions};

use crate::errors::CorrelationError;

const SNIPPET_WINDOW_LINES: usize = 6;
const LLM_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// One group's LLM assessment outcome, surfaced for observability even
/// when it didn't change anything.
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    /// Correlation group identifier the assessment targeted.
    pub group_id: String,
    /// `Some` when the collaborator returned a verdict, `None` on failure.
    pub assessment: Option<LlmAssessment>,
    /// Whether the group was suppressed as a result.
    pub suppressed: bool,
    /// Set when the collaborator could not be reached or returned
    /// something unusable; the group is kept either way.
    pub failure: Option<CorrelationError>,
}

/// Run the optional LLM pass over `groups`, returning the surviving
/// (non-suppressed) groups plus a per-group outcome log.
///
/// `source` is the full contract source, used to build a bounded snippet
/// around each group's location; when the source can't be sliced (no line
/// information) the collaborator still gets the weakness class, tools and
/// remediation, just no code excerpt.
pub async fn assess_groups(
    gateway: &LlmGateway,
    audit_id: uuid::Uuid,
    source: Option<&str>,
    groups: Vec<NormalizedFinding>,
    options: &RunOptions,
) -> (Vec<NormalizedFinding>, Vec<AssessmentOutcome>) {
    if !options.llm_enabled {
        return (groups, Vec::new());
    }

    let threshold = options.llm_severity_threshold;
    let cap = options.llm_parallelism_cap.max(1);

    let results: Vec<(NormalizedFinding, Option<AssessmentOutcome>)> = stream::iter(groups.into_iter())
        .map(|group| async move {
            if group.severity < threshold {
                return (group, None);
            }
            let outcome = assess_one(gateway, audit_id, source, &group, options.llm_suppression_threshold).await;
            (group, Some(outcome))
        })
        .buffer_unordered(cap)
        .collect()
        .await;

    let mut surviving = Vec::with_capacity(results.len());
    let mut outcomes = Vec::with_capacity(results.len());
    for (mut group, outcome) in results {
        if let Some(outcome) = outcome {
            if let Some(assessment) = &outcome.assessment {
                if assessment.confidence > group.confidence {
                    group.confidence = assessment.confidence;
                }
                group.llm_assessment = Some(assessment.clone());
            }
            let suppress = outcome.suppressed;
            outcomes.push(outcome);
            if suppress {
                continue;
            }
        }
        surviving.push(group);
    }

    (surviving, outcomes)
}

async fn assess_one(
    gateway: &LlmGateway,
    audit_id: uuid::Uuid,
    source: Option<&str>,
    group: &NormalizedFinding,
    suppression_threshold: f64,
) -> AssessmentOutcome {
    let prompt = build_prompt(source, group);

    let request = match LlmRequest::new(prompt, audit_id) {
        Ok(request) => request,
        Err(err) => return failure(group, err.to_string()),
    };

    let response = match tokio::time::timeout(LLM_REQUEST_TIMEOUT, gateway.complete(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => return failure(group, err.to_string()),
        Err(_elapsed) => return failure(group, "timed out".to_string()),
    };

    match parse_verdict(response.content()) {
        Some(assessment) => {
            let suppressed = !assessment.is_true_positive && assessment.confidence >= suppression_threshold;
            AssessmentOutcome { group_id: group.correlation_group.clone(), assessment: Some(assessment), suppressed, failure: None }
        }
        None => failure(group, "response did not contain a valid verdict".to_string()),
    }
}

fn failure(group: &NormalizedFinding, reason: String) -> AssessmentOutcome {
    let err = CorrelationError::LlmAssessmentFailed { group_id: group.correlation_group.clone(), reason };
    warn!(group = %group.correlation_group, reason = %err, "LLM assessment failed, group kept unchanged");
    AssessmentOutcome { group_id: group.correlation_group.clone(), assessment: None, suppressed: false, failure: Some(err) }
}

fn build_prompt(source: Option<&str>, group: &NormalizedFinding) -> String {
    let tools: Vec<&str> = group.detected_by.iter().map(|d| d.tool.as_str()).collect();
    let snippet = source.and_then(|src| group.location.line.map(|line| snippet_around(src, line))).unwrap_or_default();

    format!(
        "You are validating a smart-contract static-analysis finding before it is reported.\n\
         Weakness class: {weakness}\n\
         Detected by: {tools}\n\
         Default remediation: {remediation}\n\
         Source excerpt:\n{snippet}\n\n\
         Respond with a single JSON object shaped exactly like \
         {{\"is_true_positive\": bool, \"confidence\": <0.0-1.0>, \"reasoning\": \"...\", \
         \"suggested_priority\": <1-5>}}. Do not include any text besides the JSON object.",
        weakness = group.weakness.as_tag(),
        tools = tools.join(", "),
        remediation = group.remediation,
        snippet = snippet,
    )
}

fn snippet_around(source: &str, line: u32) -> String {
    let line = line.max(1) as usize;
    let start = line.saturating_sub(SNIPPET_WINDOW_LINES / 2).max(1);
    let end = line + SNIPPET_WINDOW_LINES / 2;
    source
        .lines()
        .enumerate()
        .skip(start - 1)
        .take(end.saturating_sub(start) + 1)
        .map(|(i, text)| format!("{:>5} | {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_verdict(content: &str) -> Option<LlmAssessment> {
    serde_json::from_str::<LlmAssessment>(content.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_around_clamps_to_file_start() {
        let source = "a\nb\nc\nd\ne\n";
        let snippet = snippet_around(source, 1);
        assert!(snippet.starts_with("    1 | a"));
    }

    #[test]
    fn parse_verdict_accepts_well_formed_json() {
        let raw = r#"{"is_true_positive": false, "confidence": 0.9, "reasoning": "no external call reachable", "suggested_priority": 4}"#;
        let verdict = parse_verdict(raw).expect("valid verdict");
        assert!(!verdict.is_true_positive);
        assert_eq!(verdict.suggested_priority, 4);
    }

    #[test]
    fn parse_verdict_rejects_garbage() {
        assert!(parse_verdict("not json").is_none());
        assert!(parse_verdict("{}").is_none());
    }
}
