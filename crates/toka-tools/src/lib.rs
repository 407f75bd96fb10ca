#![forbid(unsafe_code)]
#![warn(missing_docs)]
//!
//! **toka-tools** – Tool Adapter Protocol implementations and the adapter
//! registry for the Toka smart-contract audit core (C3, C4).
//!
//! Every analyzer this crate wraps — static, lint, fuzz, symbolic, formal,
//! or LLM-backed — speaks the same [`toka_types::ToolAdapter`] trait, so
//! the Orchestrator in `toka-orchestration` never special-cases a
//! particular tool. Subprocess adapters share one execution primitive
//! ([`process::run`]) that enforces the deadline and environment
//! subsetting every adapter is required to honor (§4.1).
//!
//! _Design goals_
//! * **Uniformity** – adding a seventh analyzer means one new module under
//!   [`adapters`], never a change to the registry or orchestrator.
//! * **No shell surface** – adapters build an argv vector, never a shell
//!   string; tool-specific configuration can't become a command injection.
//! * **Deterministic parsing** – `parse` never panics on malformed tool
//!   output; it returns an empty list and lets the caller decide whether
//!   that's an `INVALID_OUTPUT` envelope.

pub mod adapters;
pub mod errors;
pub mod process;
pub mod registry;

pub use registry::AdapterRegistry;
