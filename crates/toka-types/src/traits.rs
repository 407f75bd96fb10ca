//! The Tool Adapter Protocol (§4.1).
//!
//! Lives in `toka-types`, alongside the data model it operates on, so that
//! both `toka-tools` (adapter implementations) and `toka-orchestration`
//! (the registry/scheduler consuming them) can depend on the trait without
//! a cyclic crate dependency.

use async_trait::async_trait;
use std::time::Instant;

use crate::audit::ContractInput;
use crate::location::RawRecord;
use crate::tool::{RawFindingEnvelope, RunOptions, ToolMetadata, ToolStatus};

/// Uniform wrapper around one external analyzer binary or service.
///
/// Implementations must never let a failure cross this boundary as a Rust
/// panic or propagated error (§4.1 "Failure semantics") — every failure
/// mode is encoded in the returned `ToolStatus` or `RawFindingEnvelope`.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Pure, infallible metadata accessor.
    fn metadata(&self) -> &ToolMetadata;

    /// Side-effect-free check that the backing analyzer is usable. Must
    /// complete within a short internal timeout (≤ 2s) and must never
    /// raise: an unreachable tool reports `NotInstalled`, not a panic.
    async fn probe_availability(&self) -> ToolStatus;

    /// Run the analyzer against `input` and return its raw envelope.
    /// Honors `deadline`: when it elapses the adapter terminates any child
    /// process and returns a `TIMEOUT` envelope with whatever partial
    /// output it parsed, never hanging past `deadline` plus a fixed grace
    /// (≤ 5s).
    async fn analyze(
        &self,
        input: &ContractInput,
        options: &RunOptions,
        deadline: Instant,
    ) -> RawFindingEnvelope;

    /// Deterministically parse a blob of the tool's native output into raw
    /// records. Malformed input yields an empty list rather than raising;
    /// callers wrap this in an `INVALID_OUTPUT` envelope when it returns
    /// empty for non-empty input.
    fn parse(&self, raw_output: &[u8]) -> Vec<RawRecord>;
}
