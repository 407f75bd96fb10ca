//! Error types for the toka-tools crate.
//!
//! Structured, chainable errors for registry and adapter-execution failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the adapter registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No adapter with that name is registered.
    #[error("adapter '{name}' not found in registry")]
    NotFound {
        /// Requested adapter name.
        name: String,
    },
}

/// Errors raised while spawning or waiting on an adapter's child process.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The adapter binary could not be spawned (missing executable, permissions, ...).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program path or name that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process did not exit within its effective deadline and was killed.
    #[error("adapter '{tool}' exceeded its deadline of {deadline_ms}ms and was terminated")]
    DeadlineExceeded {
        /// Adapter name.
        tool: String,
        /// Effective deadline that was exceeded, in milliseconds.
        deadline_ms: u64,
    },

    /// The working directory could not be created or cleaned up.
    #[error("working directory error at '{path}': {source}")]
    WorkDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the child's stdout/stderr failed.
    #[error("failed to read output of '{tool}': {source}")]
    Io {
        /// Adapter name.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = RegistryError::NotFound { name: "sol-static".into() };
        assert_eq!(err.to_string(), "adapter 'sol-static' not found in registry");
    }

    #[test]
    fn deadline_exceeded_message() {
        let err = ProcessError::DeadlineExceeded { tool: "sol-fuzz".into(), deadline_ms: 30_000 };
        assert!(err.to_string().contains("30000ms"));
    }
}
