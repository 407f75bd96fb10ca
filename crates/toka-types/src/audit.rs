//! Audit-level types: run inputs, modes, per-tool outcomes, the final
//! audit result and its error counterpart (§3 "Audit Result", §6, §7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::finding::NormalizedFinding;
use crate::tool::EnvelopeStatus;

/// The contract under audit (§3 "Contract Input"). Immutable for the
/// duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInput {
    /// Absolute path to the contract source file.
    pub path: PathBuf,
    /// Source language version string, when detectable (e.g. "0.8.21").
    pub language_version: Option<String>,
    /// Project root for multi-file projects, if known.
    pub project_root: Option<PathBuf>,
}

/// Audit mode (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditMode {
    /// Fast static analyzers only.
    Quick,
    /// Static analyzers plus linters.
    Standard,
    /// Every available adapter.
    Full,
    /// Caller-supplied list of adapter names.
    Custom(Vec<String>),
}

impl AuditMode {
    /// Wire tag used by the JSON schema in §6.
    pub fn as_tag(&self) -> &'static str {
        match self {
            AuditMode::Quick => "QUICK",
            AuditMode::Standard => "STANDARD",
            AuditMode::Full => "FULL",
            AuditMode::Custom(_) => "CUSTOM",
        }
    }
}

/// Outcome of one adapter's participation in the audit (§3, §6 `per_tool`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerToolOutcome {
    /// Adapter name.
    pub tool: String,
    /// Completion status.
    pub status: EnvelopeStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Number of raw records the adapter produced.
    pub raw_count: usize,
    /// Short error summary, when status indicates a failure.
    pub error: Option<String>,
}

/// Severity/weakness counters computed in one pass over the final finding
/// list (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Count of findings per severity tag (e.g. "HIGH" -> 3).
    pub by_severity: HashMap<String, usize>,
    /// Count of findings per weakness tag.
    pub by_weakness: HashMap<String, usize>,
    /// Total finding count.
    pub total: usize,
}

impl AuditSummary {
    /// Compute summary counters from a final finding list.
    pub fn from_findings(findings: &[NormalizedFinding]) -> Self {
        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut by_weakness: HashMap<String, usize> = HashMap::new();
        for finding in findings {
            *by_severity.entry(finding.severity.as_tag().to_string()).or_insert(0) += 1;
            *by_weakness.entry(finding.weakness.as_tag().to_string()).or_insert(0) += 1;
        }
        Self { by_severity, by_weakness, total: findings.len() }
    }
}

/// The final, opaque result of one audit call (§3 "Audit Result", §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    /// Unique identifier for this audit run.
    pub audit_id: Uuid,
    /// UTC timestamp the audit completed.
    pub timestamp: DateTime<Utc>,
    /// Description of the audited input.
    pub input: ContractInput,
    /// Mode the audit ran under.
    pub mode: AuditMode,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Per-adapter outcomes, in plan order.
    pub per_tool: Vec<PerToolOutcome>,
    /// Normalized findings after correlation (and optional LLM filtering).
    pub findings: Vec<NormalizedFinding>,
    /// Summary counters over `findings`.
    pub summary: AuditSummary,
    /// True if the audit was cancelled before all adapters completed;
    /// `findings`/`per_tool` reflect whatever finished beforehand (§5, §7).
    #[serde(default)]
    pub cancelled: bool,
}

/// Errors that abort an audit before (or instead of) producing a result
/// (§7 "Error Handling Design").
#[derive(Debug, Error)]
pub enum AuditError {
    /// The contract path is invalid, unreadable, or the mode is unknown.
    /// No adapters are launched.
    #[error("invalid audit input: {reason}")]
    InvalidInput {
        /// Human-readable reason.
        reason: String,
    },

    /// A non-optional adapter reported a non-`AVAILABLE` status.
    #[error("required tool '{tool}' is unavailable: {reason}")]
    ToolUnavailable {
        /// Name of the unavailable tool.
        tool: String,
        /// Reason reported by the probe.
        reason: String,
    },

    /// The plan selected zero adapters.
    #[error("no adapters selected for mode {mode}")]
    NoAdaptersSelected {
        /// The mode string that produced an empty plan.
        mode: String,
    },

    /// An internal invariant (e.g. severity/score consistency after
    /// re-bucketing) was violated; this is always a bug, never a user error.
    #[error("internal invariant violated ({diagnostic_id}): {message}")]
    InvariantViolated {
        /// Stable diagnostic identifier for this class of bug.
        diagnostic_id: String,
        /// Description of what was violated.
        message: String,
    },
}
