//! The Assembler (C8, §4.8): package per-adapter outcomes and correlated
//! findings into the final `AuditResult`, computing summary counters in a
//! single pass.

use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use toka_types::{
    AuditMode, AuditResult, AuditSummary, ContractInput, EnvelopeStatus, NormalizedFinding,
    PerToolOutcome, RawFindingEnvelope,
};

/// Derive one `per_tool` row per raw envelope, preserving envelope order.
pub fn per_tool_outcomes(envelopes: &[RawFindingEnvelope]) -> Vec<PerToolOutcome> {
    envelopes.iter().map(per_tool_outcome).collect()
}

fn per_tool_outcome(envelope: &RawFindingEnvelope) -> PerToolOutcome {
    let error = match envelope.status {
        EnvelopeStatus::Success => None,
        EnvelopeStatus::Timeout => Some("adapter exceeded its deadline".to_string()),
        EnvelopeStatus::Crash => Some(envelope.stderr_excerpt.clone().unwrap_or_else(|| "adapter process crashed".to_string())),
        EnvelopeStatus::Unavailable => Some("adapter was unavailable".to_string()),
        EnvelopeStatus::InvalidOutput => Some("adapter output failed to parse".to_string()),
    };

    PerToolOutcome {
        tool: envelope.tool.clone(),
        status: envelope.status,
        duration_ms: u64::try_from(envelope.duration.as_millis()).unwrap_or(u64::MAX),
        raw_count: envelope.records.len(),
        error,
    }
}

/// Package everything a `run_audit` call produced into the stable result
/// schema (§6). `started_at` anchors `duration_ms`; the result's own
/// `timestamp` is wall-clock completion time.
pub fn assemble(
    audit_id: Uuid,
    input: ContractInput,
    mode: AuditMode,
    started_at: Instant,
    per_tool: Vec<PerToolOutcome>,
    findings: Vec<NormalizedFinding>,
    cancelled: bool,
) -> AuditResult {
    let summary = AuditSummary::from_findings(&findings);
    AuditResult {
        audit_id,
        timestamp: Utc::now(),
        input,
        mode,
        duration_ms: u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        per_tool,
        findings,
        summary,
        cancelled,
    }
}
