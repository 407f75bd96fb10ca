#![forbid(unsafe_code)]
#![warn(missing_docs)]
//!
//! **toka-correlation** – Deduplication and grouping across tool findings,
//! with optional LLM-assisted suppression (C7, §4.6).
//!
//! The Normalizer in `toka-orchestration` hands this crate a flat list of
//! [`toka_types::NormalizedFinding`]s, one per `(tool, rule, location)`
//! triple. [`correlate`] groups the findings that describe the same
//! underlying issue — same weakness class, same contract or file, close
//! enough locations — into one representative finding per group, combining
//! confidence across independent detections. With the LLM collaborator
//! disabled this is a pure function of its input (§8 "Determinism"); with
//! it enabled, every verdict the collaborator returns is carried on the
//! representative finding it applied to, never silently discarded.

mod errors;
mod grouping;
mod llm_assess;
mod similarity;
mod union_find;

pub use errors::CorrelationError;
pub use llm_assess::AssessmentOutcome;

use toka_llm_gateway::LlmGateway;
use toka_types::{NormalizedFinding, RunOptions};

/// Group `findings` and, when `options.llm_enabled`, run the optional LLM
/// suppression pass over groups at or above the configured severity
/// threshold.
///
/// `gateway` is only consulted when LLM assessment is enabled; pass
/// `None` to skip it unconditionally (e.g. when no collaborator is
/// configured for this audit, regardless of what `options` says).
/// `source` is the full contract source, used to build bounded excerpts
/// for the collaborator's prompt.
pub async fn correlate(
    findings: Vec<NormalizedFinding>,
    options: &RunOptions,
    gateway: Option<&LlmGateway>,
    audit_id: uuid::Uuid,
    source: Option<&str>,
) -> (Vec<NormalizedFinding>, Vec<AssessmentOutcome>) {
    let groups = grouping::group_findings(findings);

    match gateway {
        Some(gateway) if options.llm_enabled => llm_assess::assess_groups(gateway, audit_id, source, groups, options).await,
        _ => (groups, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toka_types::{CanonicalLocation, DetectionSource, ExternalIds, Severity, WeaknessClass};

    fn finding(id: &str, tool: &str, severity: Severity, line: u32) -> NormalizedFinding {
        NormalizedFinding {
            id: id.into(),
            detected_by: vec![DetectionSource { tool: tool.into(), rule: "r".into() }],
            weakness: WeaknessClass::Reentrancy,
            severity,
            confidence: 0.5,
            score: 5.0,
            location: CanonicalLocation { file: Some("a.sol".into()), line: Some(line), ..Default::default() },
            title: "t".into(),
            description: "d".into(),
            remediation: "fix".into(),
            external_ids: ExternalIds::default(),
            correlation_group: id.into(),
            llm_assessment: None,
        }
    }

    #[tokio::test]
    async fn correlate_without_gateway_just_groups() {
        let findings = vec![finding("a", "sol-static", Severity::Medium, 10), finding("b", "sol-symbolic", Severity::High, 11)];
        let mut options = RunOptions::default();
        options.llm_enabled = true; // should still be skipped: no gateway passed

        let (groups, outcomes) = correlate(findings, &options, None, uuid::Uuid::new_v4(), None).await;
        assert_eq!(groups.len(), 1);
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn correlate_respects_llm_enabled_flag() {
        let findings = vec![finding("a", "sol-static", Severity::Critical, 10)];
        let options = RunOptions::default(); // llm_enabled: false by default

        let (groups, outcomes) = correlate(findings, &options, None, uuid::Uuid::new_v4(), None).await;
        assert_eq!(groups.len(), 1);
        assert!(outcomes.is_empty());
    }
}
