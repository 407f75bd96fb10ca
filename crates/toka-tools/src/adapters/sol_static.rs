//! `sol-static`: a pattern/AST-based static analyzer adapter.
//!
//! Native output convention: a JSON array of objects on stdout, one per
//! finding: `{"rule_id", "message", "file", "line", "column", "function",
//! "severity"}`.

use serde::Deserialize;
use std::collections::HashMap;

use toka_types::{CanonicalLocation, ContractInput, RawRecord, RunOptions, ToolCategory, ToolMetadata};

use super::external::ExternalAnalyzerAdapter;

#[derive(Deserialize)]
struct NativeFinding {
    rule_id: String,
    message: String,
    file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    function: Option<String>,
    severity: Option<String>,
}

fn build_args(input: &ContractInput, _options: &RunOptions) -> Vec<String> {
    vec!["--json".to_string(), input.path.display().to_string()]
}

fn parse(raw_output: &[u8]) -> Vec<RawRecord> {
    let Ok(findings) = serde_json::from_slice::<Vec<NativeFinding>>(raw_output) else {
        return Vec::new();
    };
    findings
        .into_iter()
        .map(|f| RawRecord {
            native_rule_id: f.rule_id,
            message: f.message,
            location: CanonicalLocation {
                file: f.file,
                line: f.line,
                column: f.column,
                function: f.function,
                contract: None,
                byte_span: None,
            },
            severity: f.severity,
            extra: HashMap::new(),
        })
        .collect()
}

/// Build the `sol-static` adapter instance.
pub fn adapter() -> ExternalAnalyzerAdapter {
    ExternalAnalyzerAdapter::new(
        ToolMetadata {
            name: "sol-static".to_string(),
            version: "1.0.0".to_string(),
            category: ToolCategory::Static,
            capabilities: vec!["detects-reentrancy".into(), "detects-access-control".into()],
            optional: true,
            env_vars: Vec::new(),
            remote_service: false,
        },
        "sol-static",
        "--version",
        build_args,
        parse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_array() {
        let raw = br#"[{"rule_id":"reentrancy-eth","message":"external call before state update","file":"Vault.sol","line":42,"column":5,"function":"withdraw","severity":"High"}]"#;
        let records = parse(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].native_rule_id, "reentrancy-eth");
        assert_eq!(records[0].location.line, Some(42));
    }

    #[test]
    fn malformed_output_yields_empty_not_panic() {
        assert!(parse(b"not json at all").is_empty());
    }
}
