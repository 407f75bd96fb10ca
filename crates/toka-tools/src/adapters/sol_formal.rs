//! `sol-formal`: a formal-verification adapter.
//!
//! Native output convention: `{"properties": [{"name", "violated", "file",
//! "line"}]}`. Only violated properties are surfaced as findings; a
//! verification tool proving a property holds is not a defect.

use serde::Deserialize;
use std::collections::HashMap;

use toka_types::{CanonicalLocation, ContractInput, RawRecord, RunOptions, ToolCategory, ToolMetadata};

use super::external::ExternalAnalyzerAdapter;

#[derive(Deserialize)]
struct NativeReport {
    #[serde(default)]
    properties: Vec<NativeProperty>,
}

#[derive(Deserialize)]
struct NativeProperty {
    name: String,
    violated: bool,
    file: Option<String>,
    line: Option<u32>,
}

fn build_args(input: &ContractInput, _options: &RunOptions) -> Vec<String> {
    vec!["verify".to_string(), "--report".to_string(), "json".to_string(), input.path.display().to_string()]
}

fn parse(raw_output: &[u8]) -> Vec<RawRecord> {
    let Ok(report) = serde_json::from_slice::<NativeReport>(raw_output) else {
        return Vec::new();
    };
    report
        .properties
        .into_iter()
        .filter(|p| p.violated)
        .map(|p| RawRecord {
            native_rule_id: p.name.clone(),
            message: format!("property '{}' does not hold", p.name),
            location: CanonicalLocation { file: p.file, line: p.line, column: None, function: None, contract: None, byte_span: None },
            severity: None,
            extra: HashMap::new(),
        })
        .collect()
}

/// Build the `sol-formal` adapter instance.
pub fn adapter() -> ExternalAnalyzerAdapter {
    ExternalAnalyzerAdapter::new(
        ToolMetadata {
            name: "sol-formal".to_string(),
            version: "1.0.0".to_string(),
            category: ToolCategory::Formal,
            capabilities: vec!["proves-invariants".into()],
            optional: true,
            env_vars: Vec::new(),
            remote_service: false,
        },
        "sol-formal",
        "--version",
        build_args,
        parse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_violated_properties_become_records() {
        let raw = br#"{"properties":[{"name":"no-untrusted-delegatecall","violated":true,"file":"Proxy.sol","line":12},{"name":"owner-immutable","violated":false}]}"#;
        let records = parse(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].native_rule_id, "no-untrusted-delegatecall");
    }
}
