//! `sol-symbolic`: a symbolic-execution adapter.
//!
//! Native output convention: `{"issues": [{"swc_id", "title", "filename",
//! "lineno", "function"}]}`, mirroring the SWC-indexed report shape common
//! to symbolic-execution tools for this ecosystem.

use serde::Deserialize;
use std::collections::HashMap;

use toka_types::{CanonicalLocation, ContractInput, RawRecord, RunOptions, ToolCategory, ToolMetadata};

use super::external::ExternalAnalyzerAdapter;

#[derive(Deserialize)]
struct NativeReport {
    #[serde(default)]
    issues: Vec<NativeIssue>,
}

#[derive(Deserialize)]
struct NativeIssue {
    swc_id: String,
    title: String,
    filename: Option<String>,
    lineno: Option<u32>,
    function: Option<String>,
}

fn build_args(input: &ContractInput, _options: &RunOptions) -> Vec<String> {
    vec!["analyze".to_string(), "-o".to_string(), "jsonv2".to_string(), input.path.display().to_string()]
}

fn parse(raw_output: &[u8]) -> Vec<RawRecord> {
    let Ok(report) = serde_json::from_slice::<NativeReport>(raw_output) else {
        return Vec::new();
    };
    report
        .issues
        .into_iter()
        .map(|issue| RawRecord {
            native_rule_id: issue.swc_id,
            message: issue.title,
            location: CanonicalLocation {
                file: issue.filename,
                line: issue.lineno,
                column: None,
                function: issue.function,
                contract: None,
                byte_span: None,
            },
            severity: None,
            extra: HashMap::new(),
        })
        .collect()
}

/// Build the `sol-symbolic` adapter instance.
pub fn adapter() -> ExternalAnalyzerAdapter {
    ExternalAnalyzerAdapter::new(
        ToolMetadata {
            name: "sol-symbolic".to_string(),
            version: "1.0.0".to_string(),
            category: ToolCategory::Symbolic,
            capabilities: vec!["produces-counterexample".into(), "path-exploration".into()],
            optional: true,
            env_vars: Vec::new(),
            remote_service: false,
        },
        "sol-symbolic",
        "--version",
        build_args,
        parse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_swc_indexed_issues() {
        let raw = br#"{"issues":[{"swc_id":"SWC-107","title":"Reentrancy","filename":"Vault.sol","lineno":42,"function":"withdraw"}]}"#;
        let records = parse(raw);
        assert_eq!(records[0].native_rule_id, "SWC-107");
        assert_eq!(records[0].location.function.as_deref(), Some("withdraw"));
    }
}
