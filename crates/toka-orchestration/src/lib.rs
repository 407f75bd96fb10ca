#![forbid(unsafe_code)]
#![warn(missing_docs)]
//!
//! **toka-orchestration** – Orchestrator, Normalizer, Assembler and the
//! Core API facade for the Toka smart-contract audit core (C5, C6, C8, §6).
//!
//! [`Orchestrator::run_audit`] is the single entry point tying the whole
//! pipeline together: build a plan from the registry (§4.3 steps 1–2), run
//! it under a bounded-parallelism executor with per-adapter deadlines
//! (§4.3 step 3, §5), normalize every raw record (§4.4), correlate and
//! optionally LLM-assess the result (§4.6), and assemble the stable
//! `AuditResult` (§4.8).

mod assemble;
mod cancellation;
mod execute;
mod normalize;
mod plan;

pub use cancellation::CancellationToken;
pub use normalize::NormalizeStats;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use toka_correlation::correlate;
use toka_llm_gateway::LlmGateway;
use toka_taxonomy::TaxonomyTables;
use toka_tools::AdapterRegistry;
use toka_types::{AuditError, AuditMode, AuditResult, ContractInput, RunOptions, ToolMetadata, ToolStatus};

/// The audit core: a read-only adapter registry and taxonomy, plus an
/// optional LLM collaborator, all set up once and reused across audits
/// (§5 "stateless across audits except static Registry/Taxonomy").
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    taxonomy: Arc<TaxonomyTables>,
    llm_gateway: Option<Arc<LlmGateway>>,
}

impl Orchestrator {
    /// Build an orchestrator over an already-populated registry and a
    /// loaded taxonomy. `llm_gateway` is `None` when no collaborator is
    /// configured; callers with `RunOptions::llm_enabled = true` but no
    /// gateway get the groups back unassessed rather than an error (§4.6).
    pub fn new(registry: AdapterRegistry, taxonomy: TaxonomyTables, llm_gateway: Option<LlmGateway>) -> Self {
        Self { registry: Arc::new(registry), taxonomy: Arc::new(taxonomy), llm_gateway: llm_gateway.map(Arc::new) }
    }

    /// List metadata for every registered adapter (§6 `list_tools`).
    pub async fn list_tools(&self) -> Vec<ToolMetadata> {
        self.registry.list().await
    }

    /// Probe one adapter's current availability by name (§6 `probe_tool`).
    pub async fn probe_tool(&self, name: &str) -> Result<ToolStatus, AuditError> {
        let adapter = self
            .registry
            .get(name)
            .await
            .map_err(|_| AuditError::InvalidInput { reason: format!("unknown tool '{name}'") })?;
        Ok(adapter.probe_availability().await)
    }

    /// Run a full audit (§6 `run_audit`): build the plan, execute it,
    /// normalize, correlate, and assemble the stable result.
    ///
    /// `cancellation` lets a caller request an early, cooperative stop; a
    /// cancelled audit still returns whatever normalized/correlated
    /// findings it gathered before the request landed, with `cancelled`
    /// set on the result (§5, §7).
    pub async fn run_audit(
        &self,
        input: ContractInput,
        mode: AuditMode,
        options: RunOptions,
        cancellation: CancellationToken,
    ) -> Result<AuditResult, AuditError> {
        let audit_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(audit_id = %audit_id, mode = mode.as_tag(), "starting audit");

        let planned = plan::build_plan(&self.registry, &mode).await?;
        let plan_names: Vec<String> = planned.iter().map(|a| a.metadata().name.clone()).collect();

        let envelopes = execute::execute_plan(planned, &input, &options, &cancellation).await;
        let per_tool = assemble::per_tool_outcomes(&envelopes);

        let (normalized, stats) = normalize::normalize_envelopes(&envelopes, &input, &self.taxonomy);
        if stats.unmapped_rules > 0 {
            warn!(audit_id = %audit_id, unmapped = stats.unmapped_rules, total = stats.total, "normalizer hit unmapped taxonomy rules");
        }

        let source = match tokio::fs::read_to_string(&input.path).await {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(audit_id = %audit_id, error = %err, "could not read contract source for LLM assessment snippets");
                None
            }
        };

        let (correlated, llm_outcomes) = correlate(normalized, &options, self.llm_gateway.as_deref(), audit_id, source.as_deref()).await;
        let failed_llm = llm_outcomes.iter().filter(|o| o.failure.is_some()).count();
        if failed_llm > 0 {
            warn!(audit_id = %audit_id, failed = failed_llm, "some LLM assessments failed and were skipped");
        }

        let cancelled = cancellation.is_cancelled();
        if cancelled {
            warn!(audit_id = %audit_id, "audit cancelled before every adapter completed");
        }

        let result = assemble::assemble(audit_id, input, mode, started_at, per_tool, correlated, cancelled);
        info!(audit_id = %audit_id, findings = result.summary.total, tools = plan_names.len(), duration_ms = result.duration_ms, "audit complete");
        Ok(result)
    }
}

/// Serialize an `AuditResult` to the stable JSON schema of §6, field order
/// matching the struct's own declaration order.
pub fn audit_result_to_json(result: &AuditResult) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use toka_types::{CanonicalLocation, EnvelopeStatus, RawFindingEnvelope, RawRecord, ToolAdapter, ToolCategory};

    struct StaticStub;

    #[async_trait]
    impl ToolAdapter for StaticStub {
        fn metadata(&self) -> &ToolMetadata {
            static META: std::sync::OnceLock<ToolMetadata> = std::sync::OnceLock::new();
            META.get_or_init(|| ToolMetadata {
                name: "sol-static".to_string(),
                version: "1.0.0".to_string(),
                category: ToolCategory::Static,
                capabilities: Vec::new(),
                optional: false,
                env_vars: Vec::new(),
                remote_service: false,
            })
        }

        async fn probe_availability(&self) -> ToolStatus {
            ToolStatus::Available
        }

        async fn analyze(&self, _input: &ContractInput, _options: &RunOptions, _deadline: Instant) -> RawFindingEnvelope {
            RawFindingEnvelope {
                tool: "sol-static".to_string(),
                status: EnvelopeStatus::Success,
                duration: Duration::from_millis(5),
                exit_status: Some(0),
                records: vec![RawRecord {
                    native_rule_id: "reentrancy-eth".to_string(),
                    message: "External call before state update".to_string(),
                    location: CanonicalLocation { file: Some("a.sol".to_string()), line: Some(10), ..Default::default() },
                    severity: None,
                    extra: Default::default(),
                }],
                stderr_excerpt: None,
            }
        }

        fn parse(&self, _raw_output: &[u8]) -> Vec<RawRecord> {
            Vec::new()
        }
    }

    async fn orchestrator() -> Orchestrator {
        let registry = AdapterRegistry::new();
        registry.register(Arc::new(StaticStub)).await;
        let taxonomy = TaxonomyTables::load_default().expect("default taxonomy parses");
        Orchestrator::new(registry, taxonomy, None)
    }

    #[tokio::test]
    async fn run_audit_end_to_end_produces_one_finding() {
        let orchestrator = orchestrator().await;
        let input = ContractInput { path: "/proj/a.sol".into(), language_version: None, project_root: None };

        let result = orchestrator
            .run_audit(input, AuditMode::Quick, RunOptions::default(), CancellationToken::new())
            .await
            .expect("audit succeeds");

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.summary.total, 1);
        assert!(!result.cancelled);
        assert_eq!(result.per_tool.len(), 1);
    }

    #[tokio::test]
    async fn list_tools_reflects_the_registry() {
        let orchestrator = orchestrator().await;
        let tools = orchestrator.list_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "sol-static");
    }

    #[tokio::test]
    async fn probe_tool_rejects_an_unknown_name() {
        let orchestrator = orchestrator().await;
        let err = orchestrator.probe_tool("does-not-exist").await.unwrap_err();
        assert!(matches!(err, AuditError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn audit_result_to_json_round_trips_through_serde() {
        let orchestrator = orchestrator().await;
        let input = ContractInput { path: "/proj/a.sol".into(), language_version: None, project_root: None };
        let result = orchestrator
            .run_audit(input, AuditMode::Quick, RunOptions::default(), CancellationToken::new())
            .await
            .expect("audit succeeds");

        let bytes = audit_result_to_json(&result).expect("serializes");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(value["summary"]["total"], 1);
    }

    #[tokio::test]
    async fn run_audit_succeeds_when_the_contract_path_does_not_exist() {
        // `input.path` is read for LLM-assessment snippets; a missing file
        // must degrade to no snippet, never fail the audit.
        let orchestrator = orchestrator().await;
        let input = ContractInput { path: "/does/not/exist.sol".into(), language_version: None, project_root: None };

        let result = orchestrator
            .run_audit(input, AuditMode::Quick, RunOptions::default(), CancellationToken::new())
            .await
            .expect("audit succeeds even when the contract source can't be read");

        assert_eq!(result.summary.total, 1);
    }

    #[tokio::test]
    async fn run_audit_reads_the_real_contract_source_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Vault.sol");
        std::fs::write(&path, "contract Vault { function withdraw() public {} }").expect("write fixture contract");

        let orchestrator = orchestrator().await;
        let input = ContractInput { path, language_version: None, project_root: None };

        let result = orchestrator
            .run_audit(input, AuditMode::Quick, RunOptions::default(), CancellationToken::new())
            .await
            .expect("audit succeeds");

        assert_eq!(result.summary.total, 1);
    }
}
