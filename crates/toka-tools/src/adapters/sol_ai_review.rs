//! `sol-ai-review`: an LLM-backed reviewer adapter.
//!
//! Unlike the other five adapters this one has no child process: it is a
//! thin [`ToolAdapter`] wrapper around `toka-llm-gateway`, so the same
//! Orchestrator scheduling, deadline and failure-handling logic that
//! governs subprocess adapters applies uniformly to a remote-service one
//! (§4.1 "remote_service").

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::time::timeout;
use tracing::warn;

use toka_llm_gateway::{LlmGateway, LlmRequest};
use toka_types::{CanonicalLocation, ContractInput, EnvelopeStatus, RawFindingEnvelope, RawRecord, RunOptions, ToolAdapter, ToolCategory, ToolMetadata, ToolStatus};

#[derive(Deserialize)]
struct NativeFinding {
    rule_id: String,
    message: String,
    file: Option<String>,
    line: Option<u32>,
    function: Option<String>,
    severity: Option<String>,
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
            location: CanonicalLocation { file: f.file, line: f.line, column: None, function: f.function, contract: None, byte_span: None },
            severity: f.severity,
            extra: HashMap::new(),
        })
        .collect()
}

fn review_prompt(source: &str) -> String {
    format!(
        "You are reviewing a smart contract for access-control defects only. \
         Respond with a JSON array of objects shaped exactly like \
         {{\"rule_id\": \"access-control\", \"message\": ..., \"file\": null, \
         \"line\": <1-indexed line or null>, \"function\": <name or null>, \
         \"severity\": <\"Critical\"|\"High\"|\"Medium\"|\"Low\"|null>}}. \
         Return `[]` if you find nothing. Do not include any text besides the JSON array.\n\n\
         Contract source:\n{source}"
    )
}

/// `sol-ai-review` adapter: a remote LLM reviewer focused on access control.
pub struct SolAiReviewAdapter {
    meta: ToolMetadata,
    gateway: LlmGateway,
}

impl SolAiReviewAdapter {
    /// Wrap an already-configured gateway as the `sol-ai-review` adapter.
    pub fn new(gateway: LlmGateway) -> Self {
        Self {
            meta: ToolMetadata {
                name: "sol-ai-review".to_string(),
                version: "1.0.0".to_string(),
                category: ToolCategory::Ai,
                capabilities: vec!["detects-access-control".into()],
                optional: true,
                env_vars: Vec::new(),
                remote_service: true,
            },
            gateway,
        }
    }
}

#[async_trait]
impl ToolAdapter for SolAiReviewAdapter {
    fn metadata(&self) -> &ToolMetadata {
        &self.meta
    }

    async fn probe_availability(&self) -> ToolStatus {
        // The gateway's provider was already validated at construction time;
        // a live round-trip here would burn quota on every plan build, so
        // this only confirms the adapter itself is wired up.
        ToolStatus::Available
    }

    async fn analyze(&self, input: &ContractInput, _options: &RunOptions, deadline: Instant) -> RawFindingEnvelope {
        let start = Instant::now();
        let source = match tokio::fs::read_to_string(&input.path).await {
            Ok(source) => source,
            Err(err) => {
                warn!(tool = %self.meta.name, error = %err, "could not read contract source");
                return RawFindingEnvelope::unavailable(&self.meta.name);
            }
        };

        let audit_id = uuid::Uuid::new_v4();
        let request = match LlmRequest::new(review_prompt(&source), audit_id) {
            Ok(request) => request,
            Err(err) => {
                warn!(tool = %self.meta.name, error = %err, "failed to build LLM request");
                return RawFindingEnvelope::unavailable(&self.meta.name);
            }
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, self.gateway.complete(request)).await {
            Ok(Ok(response)) => {
                let records = parse(response.content().as_bytes());
                if records.is_empty() && response.content().trim() != "[]" {
                    RawFindingEnvelope::invalid_output(&self.meta.name, start.elapsed(), None, Some(response.content().to_string()))
                } else {
                    RawFindingEnvelope {
                        tool: self.meta.name.clone(),
                        status: EnvelopeStatus::Success,
                        duration: start.elapsed(),
                        exit_status: None,
                        records,
                        stderr_excerpt: None,
                    }
                }
            }
            Ok(Err(err)) => {
                warn!(tool = %self.meta.name, error = %err, "LLM gateway request failed");
                RawFindingEnvelope::unavailable(&self.meta.name)
            }
            Err(_elapsed) => RawFindingEnvelope::timeout(&self.meta.name, start.elapsed(), Vec::new()),
        }
    }

    fn parse(&self, raw_output: &[u8]) -> Vec<RawRecord> {
        parse(raw_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_findings() {
        let raw = br#"[{"rule_id":"access-control","message":"mint() has no owner check","file":null,"line":88,"function":"mint","severity":"Critical"}]"#;
        let records = parse(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].native_rule_id, "access-control");
    }

    #[test]
    fn empty_array_is_not_invalid() {
        assert!(parse(b"[]").is_empty());
    }
}
