//! `sol-fuzz`: a property-based fuzzing adapter.
//!
//! Native output convention: `{"results": [{"test", "description", "file",
//! "line"}]}` — fuzzers report failing test names rather than rule ids.

use serde::Deserialize;
use std::collections::HashMap;

use toka_types::{CanonicalLocation, ContractInput, RawRecord, RunOptions, ToolCategory, ToolMetadata};

use super::external::ExternalAnalyzerAdapter;

#[derive(Deserialize)]
struct NativeReport {
    #[serde(default)]
    results: Vec<NativeFinding>,
}

#[derive(Deserialize)]
struct NativeFinding {
    test: String,
    description: String,
    file: Option<String>,
    line: Option<u32>,
}

fn build_args(input: &ContractInput, options: &RunOptions) -> Vec<String> {
    let mut args = vec!["--format".to_string(), "json".to_string()];
    if let Some(seconds) = options.per_tool_timeout {
        args.push("--timeout".into());
        args.push(seconds.as_secs().to_string());
    }
    args.push(input.path.display().to_string());
    args
}

fn parse(raw_output: &[u8]) -> Vec<RawRecord> {
    let Ok(report) = serde_json::from_slice::<NativeReport>(raw_output) else {
        return Vec::new();
    };
    report
        .results
        .into_iter()
        .map(|f| RawRecord {
            native_rule_id: f.test,
            message: f.description,
            location: CanonicalLocation { file: f.file, line: f.line, column: None, function: None, contract: None, byte_span: None },
            severity: None,
            extra: HashMap::new(),
        })
        .collect()
}

/// Build the `sol-fuzz` adapter instance.
pub fn adapter() -> ExternalAnalyzerAdapter {
    ExternalAnalyzerAdapter::new(
        ToolMetadata {
            name: "sol-fuzz".to_string(),
            version: "1.0.0".to_string(),
            category: ToolCategory::Dynamic,
            capabilities: vec!["produces-counterexample".into()],
            optional: true,
            env_vars: Vec::new(),
            remote_service: false,
        },
        "sol-fuzz",
        "--version",
        build_args,
        parse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_array() {
        let raw = br#"{"results":[{"test":"echidna-reentrancy","description":"balance invariant violated","file":"Vault.sol","line":55}]}"#;
        let records = parse(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].native_rule_id, "echidna-reentrancy");
    }

    #[test]
    fn empty_results_array_is_not_an_error() {
        let records = parse(br#"{"results":[]}"#);
        assert!(records.is_empty());
    }
}
