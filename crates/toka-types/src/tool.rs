//! Tool metadata, status and execution options (§3 "Tool Metadata" / "Tool
//! Status", §4.1 Tool Adapter Protocol).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::location::RawRecord;

/// Analyzer category, used by the Orchestrator to order plan execution
/// (§4.3 step 2: static/linter first, then dynamic/symbolic, formal, ai/ml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Static analyzer (pattern/AST based).
    Static,
    /// Lint-style checks; grouped with static for scheduling purposes.
    Linter,
    /// Fuzzing or other dynamic execution.
    Dynamic,
    /// Symbolic execution.
    Symbolic,
    /// Formal verification.
    Formal,
    /// AI-assisted analysis (e.g. an LLM reviewer).
    Ai,
    /// Machine-learning classifier.
    Ml,
}

impl ToolCategory {
    /// Scheduling rank used to order the plan: lower runs first.
    ///
    /// Static and Linter share a rank since §4.3 groups them as "cheap".
    pub fn schedule_rank(self) -> u8 {
        match self {
            ToolCategory::Static | ToolCategory::Linter => 0,
            ToolCategory::Dynamic | ToolCategory::Symbolic => 1,
            ToolCategory::Formal => 2,
            ToolCategory::Ai | ToolCategory::Ml => 3,
        }
    }
}

/// Static metadata describing one adapter instance (§3 "Tool Metadata").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Unique identifier, lowercase-with-dashes (e.g. "slither-static").
    pub name: String,
    /// Semantic version of the underlying analyzer, not this crate.
    pub version: String,
    /// Analyzer category.
    pub category: ToolCategory,
    /// Declared capability flags (e.g. "detects-reentrancy",
    /// "produces-counterexample").
    pub capabilities: Vec<String>,
    /// When true, a missing/unavailable tool must never fail the audit.
    pub optional: bool,
    /// Environment variable names this adapter reads, enumerated for the
    /// caller per §6 ("limited to that adapter's needs").
    pub env_vars: Vec<String>,
    /// True when the adapter is inherently a remote service (e.g. an LLM
    /// collaborator) rather than a local child process (§4.1).
    pub remote_service: bool,
}

/// Availability of a tool's backing analyzer, computed by `probe_availability`
/// and cached for the duration of one audit (§3 "Tool Status").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStatus {
    /// The analyzer is installed and usable.
    Available,
    /// The analyzer binary/service could not be found.
    NotInstalled,
    /// The analyzer is installed but at an incompatible version.
    VersionMismatch {
        /// Version found on the system.
        found: String,
        /// Minimum version required.
        required: String,
    },
    /// Unavailable for some other reason (e.g. a remote service timed out).
    Unavailable {
        /// Human-readable reason.
        reason: String,
    },
}

impl ToolStatus {
    /// True only for `Available`.
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available)
    }
}

/// Outcome status of one adapter's `analyze` call (§3 "Raw Finding
/// Envelope").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeStatus {
    /// The analyzer ran to completion and its output parsed cleanly.
    Success,
    /// The analyzer exceeded its deadline and was terminated.
    Timeout,
    /// The analyzer's child process terminated abnormally.
    Crash,
    /// The analyzer could not be reached/run at all.
    Unavailable,
    /// The analyzer produced output that failed to parse.
    InvalidOutput,
}

/// Per-invocation options recognized by every adapter (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Soft timeout for a single adapter invocation, before the
    /// Orchestrator's global-budget reduction (§4.3 step 3).
    pub timeout_seconds: u64,
    /// Verbosity level forwarded to adapters that support it.
    pub verbosity: u8,
    /// Tool-specific flags, opaque to the core, keyed by tool name.
    #[serde(default)]
    pub tool_flags: HashMap<String, HashMap<String, String>>,
    /// Working directory an adapter should run in.
    pub working_directory: Option<PathBuf>,
    /// Whether to capture a stderr excerpt on failure.
    pub capture_stderr: bool,
    /// Per-tool timeout override, if different from `timeout_seconds`.
    pub per_tool_timeout: Option<Duration>,
    /// Whether the Correlation Engine should call the LLM collaborator.
    pub llm_enabled: bool,
    /// Minimum severity (inclusive) that triggers an LLM assessment.
    pub llm_severity_threshold: super::finding::Severity,
    /// Confidence above which a group marked not-true-positive is suppressed.
    pub llm_suppression_threshold: f64,
    /// Maximum number of LLM calls in flight at once (§4.6).
    pub llm_parallelism_cap: usize,
    /// Maximum parallel adapter executions (§4.3); `None` means "number of
    /// logical CPUs, minimum 2".
    pub parallelism_cap: Option<usize>,
    /// Whole-audit deadline in seconds from the start of `run_audit`, if
    /// any; reduces every in-flight adapter's deadline to
    /// `min(current, remaining-global-budget)` (§4.3 step 3, §5).
    pub global_deadline_seconds: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            verbosity: 0,
            tool_flags: HashMap::new(),
            working_directory: None,
            capture_stderr: true,
            per_tool_timeout: None,
            llm_enabled: false,
            llm_severity_threshold: super::finding::Severity::High,
            llm_suppression_threshold: 0.85,
            llm_parallelism_cap: 4,
            parallelism_cap: None,
            global_deadline_seconds: None,
        }
    }
}

impl RunOptions {
    /// Override the soft per-invocation timeout.
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set a tool-specific flag, e.g. `with_tool_flag("sol-static", "max-depth", "4")`.
    pub fn with_tool_flag(mut self, tool: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tool_flags.entry(tool.into()).or_default().insert(key.into(), value.into());
        self
    }

    /// Override the working directory adapters run in.
    pub fn with_working_directory(mut self, working_directory: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(working_directory.into());
        self
    }

    /// Override the per-tool timeout, distinct from `timeout_seconds`.
    pub fn with_per_tool_timeout(mut self, per_tool_timeout: Duration) -> Self {
        self.per_tool_timeout = Some(per_tool_timeout);
        self
    }

    /// Enable the LLM collaborator for correlation-stage assessment.
    pub fn with_llm_enabled(mut self, enabled: bool) -> Self {
        self.llm_enabled = enabled;
        self
    }

    /// Cap the number of adapters that may run concurrently.
    pub fn with_parallelism_cap(mut self, cap: usize) -> Self {
        self.parallelism_cap = Some(cap);
        self
    }

    /// Set a whole-audit deadline, in seconds from the start of `run_audit`.
    pub fn with_global_deadline_seconds(mut self, seconds: u64) -> Self {
        self.global_deadline_seconds = Some(seconds);
        self
    }
}

/// Output of one adapter invocation, successful or not (§3 "Raw Finding
/// Envelope").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFindingEnvelope {
    /// Name of the tool that produced this envelope.
    pub tool: String,
    /// Outcome status.
    pub status: EnvelopeStatus,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
    /// Process exit status, when the adapter launched a child process.
    pub exit_status: Option<i32>,
    /// Untyped records parsed from the tool's native output.
    pub records: Vec<RawRecord>,
    /// Captured stderr excerpt, bounded in size, when requested and available.
    pub stderr_excerpt: Option<String>,
}

impl RawFindingEnvelope {
    /// Build a `TIMEOUT` envelope carrying whatever records were parsed
    /// before the deadline elapsed (§4.1).
    pub fn timeout(tool: impl Into<String>, duration: Duration, partial: Vec<RawRecord>) -> Self {
        Self {
            tool: tool.into(),
            status: EnvelopeStatus::Timeout,
            duration,
            exit_status: None,
            records: partial,
            stderr_excerpt: None,
        }
    }

    /// Build an `UNAVAILABLE` envelope for a tool that could not be probed
    /// or run at all.
    pub fn unavailable(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: EnvelopeStatus::Unavailable,
            duration: Duration::ZERO,
            exit_status: None,
            records: Vec::new(),
            stderr_excerpt: None,
        }
    }

    /// Build an `INVALID_OUTPUT` envelope: malformed output never raises,
    /// per §4.1's `parse` contract.
    pub fn invalid_output(
        tool: impl Into<String>,
        duration: Duration,
        exit_status: Option<i32>,
        stderr_excerpt: Option<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            status: EnvelopeStatus::InvalidOutput,
            duration,
            exit_status,
            records: Vec::new(),
            stderr_excerpt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_only_the_fields_it_touches() {
        let options = RunOptions::default()
            .with_timeout_seconds(30)
            .with_tool_flag("sol-static", "max-depth", "4")
            .with_parallelism_cap(2)
            .with_global_deadline_seconds(120);

        assert_eq!(options.timeout_seconds, 30);
        assert_eq!(options.tool_flags["sol-static"]["max-depth"], "4");
        assert_eq!(options.parallelism_cap, Some(2));
        assert_eq!(options.global_deadline_seconds, Some(120));
        assert!(!options.llm_enabled);
    }
}
