//! `sol-lint`: a style/best-practice linter adapter.
//!
//! Native output convention: newline-delimited JSON (one object per line),
//! each `{"check", "msg", "path", "line"}`.

use serde::Deserialize;
use std::collections::HashMap;

use toka_types::{CanonicalLocation, ContractInput, RawRecord, RunOptions, ToolCategory, ToolMetadata};

use super::external::ExternalAnalyzerAdapter;

#[derive(Deserialize)]
struct NativeFinding {
    check: String,
    msg: String,
    path: Option<String>,
    line: Option<u32>,
}

fn build_args(input: &ContractInput, _options: &RunOptions) -> Vec<String> {
    vec!["--ndjson".to_string(), input.path.display().to_string()]
}

fn parse(raw_output: &[u8]) -> Vec<RawRecord> {
    let text = String::from_utf8_lossy(raw_output);
    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(finding) = serde_json::from_str::<NativeFinding>(line) {
            records.push(RawRecord {
                native_rule_id: finding.check,
                message: finding.msg,
                location: CanonicalLocation { file: finding.path, line: finding.line, column: None, function: None, contract: None, byte_span: None },
                severity: None,
                extra: HashMap::new(),
            });
        }
    }
    records
}

/// Build the `sol-lint` adapter instance.
pub fn adapter() -> ExternalAnalyzerAdapter {
    ExternalAnalyzerAdapter::new(
        ToolMetadata {
            name: "sol-lint".to_string(),
            version: "1.0.0".to_string(),
            category: ToolCategory::Linter,
            capabilities: vec!["detects-weak-prng".into(), "detects-timestamp-dep".into()],
            optional: true,
            env_vars: Vec::new(),
            remote_service: false,
        },
        "sol-lint",
        "--version",
        build_args,
        parse,
    )
}
