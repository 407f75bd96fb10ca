//! Generic adapter over an external analyzer binary (§4.1, §4.2).
//!
//! Each concrete adapter (`sol-static`, `sol-lint`, ...) is a thin
//! configuration of this type: a program name, an argv template, and a
//! `parse` function for that tool's native output shape. The shared logic
//! — probing, environment subsetting, deadline handling — lives here once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use toka_types::{ContractInput, EnvelopeStatus, RawFindingEnvelope, RawRecord, RunOptions, ToolAdapter, ToolMetadata, ToolStatus};

use crate::process::{self, ProcessSpec};

/// `raw_output -> Vec<RawRecord>` for one tool's native format.
pub type ParseFn = fn(&[u8]) -> Vec<RawRecord>;

/// `(contract, options) -> argv` for one tool's invocation convention.
pub type ArgsFn = fn(&ContractInput, &RunOptions) -> Vec<String>;

/// Environment variables always forwarded regardless of adapter, so a
/// child process can still resolve its own shared libraries/toolchain.
const BASE_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME"];

/// Adapter wrapping one external analyzer child process.
pub struct ExternalAnalyzerAdapter {
    meta: ToolMetadata,
    program: String,
    version_flag: &'static str,
    build_args: ArgsFn,
    parse_fn: ParseFn,
}

impl ExternalAnalyzerAdapter {
    /// Construct an adapter for a specific external binary.
    pub fn new(meta: ToolMetadata, program: impl Into<String>, version_flag: &'static str, build_args: ArgsFn, parse_fn: ParseFn) -> Self {
        Self { meta, program: program.into(), version_flag, build_args, parse_fn }
    }

    fn env_subset(&self, options: &RunOptions) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for key in BASE_ENV_ALLOWLIST.iter().chain(self.meta.env_vars.iter().map(String::as_str)) {
            if let Ok(value) = std::env::var(key) {
                env.insert(key.to_string(), value);
            }
        }
        if let Some(tool_flags) = options.tool_flags.get(&self.meta.name) {
            for (k, v) in tool_flags {
                env.insert(format!("TOKA_FLAG_{}", k.to_uppercase()), v.clone());
            }
        }
        env
    }

    fn working_directory(&self, input: &ContractInput, options: &RunOptions) -> PathBuf {
        options
            .working_directory
            .clone()
            .or_else(|| input.project_root.clone())
            .unwrap_or_else(|| input.path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")))
    }
}

#[async_trait]
impl ToolAdapter for ExternalAnalyzerAdapter {
    fn metadata(&self) -> &ToolMetadata {
        &self.meta
    }

    async fn probe_availability(&self) -> ToolStatus {
        let probe = timeout(
            std::time::Duration::from_secs(2),
            Command::new(&self.program).arg(self.version_flag).output(),
        )
        .await;

        match probe {
            Ok(Ok(output)) if output.status.success() => ToolStatus::Available,
            Ok(Ok(_)) => ToolStatus::Unavailable { reason: format!("'{}' exited non-zero on version probe", self.program) },
            Ok(Err(err)) => ToolStatus::NotInstalled.tap_log(&self.meta.name, &err.to_string()),
            Err(_) => ToolStatus::Unavailable { reason: "version probe exceeded 2s".into() },
        }
    }

    async fn analyze(&self, input: &ContractInput, options: &RunOptions, deadline: Instant) -> RawFindingEnvelope {
        let spec = ProcessSpec {
            program: self.program.clone(),
            args: (self.build_args)(input, options),
            working_directory: self.working_directory(input, options),
            env: self.env_subset(options),
        };

        match process::run(spec, deadline, options.capture_stderr).await {
            Ok(output) if output.timed_out => RawFindingEnvelope::timeout(&self.meta.name, output.duration, (self.parse_fn)(&output.stdout)),
            Ok(output) => {
                let records = (self.parse_fn)(&output.stdout);
                if records.is_empty() && !output.stdout.is_empty() {
                    RawFindingEnvelope::invalid_output(&self.meta.name, output.duration, output.exit_status, output.stderr_excerpt)
                } else {
                    RawFindingEnvelope {
                        tool: self.meta.name.clone(),
                        status: EnvelopeStatus::Success,
                        duration: output.duration,
                        exit_status: output.exit_status,
                        records,
                        stderr_excerpt: output.stderr_excerpt,
                    }
                }
            }
            Err(err) => {
                warn!(tool = %self.meta.name, error = %err, "adapter process failed");
                RawFindingEnvelope::unavailable(&self.meta.name)
            }
        }
    }

    fn parse(&self, raw_output: &[u8]) -> Vec<RawRecord> {
        (self.parse_fn)(raw_output)
    }
}

trait TapLog {
    fn tap_log(self, tool: &str, reason: &str) -> Self;
}

impl TapLog for ToolStatus {
    fn tap_log(self, tool: &str, reason: &str) -> Self {
        warn!(tool, reason, "probe failed, treating as not installed");
        self
    }
}
