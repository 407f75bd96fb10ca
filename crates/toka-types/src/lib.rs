#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **toka-types** – Canonical data model for the Toka smart-contract audit
//! core.
//!
//! The crate is dependency-light and sits at the bottom of the crate graph
//! so that every other crate (`toka-tools`, `toka-taxonomy`,
//! `toka-correlation`, `toka-orchestration`) can depend on it without
//! causing cycles. It makes no assumptions about which analyzers exist,
//! how they are scheduled, or how results are rendered — only the shapes
//! they pass between each other.

pub mod audit;
pub mod finding;
pub mod location;
pub mod tool;
pub mod traits;

pub use audit::{AuditError, AuditMode, AuditSummary, AuditResult, ContractInput, PerToolOutcome};
pub use finding::{
    mint_finding_id, DetectionSource, ExternalIds, LlmAssessment, NormalizedFinding, Severity,
    WeaknessClass,
};
pub use location::{CanonicalLocation, RawRecord};
pub use tool::{EnvelopeStatus, RawFindingEnvelope, RunOptions, ToolCategory, ToolMetadata, ToolStatus};
pub use traits::ToolAdapter;
