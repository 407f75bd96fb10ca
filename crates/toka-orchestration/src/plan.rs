//! Plan construction (§4.3 steps 1–2): turn an [`AuditMode`] into an
//! ordered, all-available set of adapters.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use toka_tools::AdapterRegistry;
use toka_types::{AuditError, AuditMode, ToolAdapter, ToolCategory, ToolStatus};

/// Build the execution plan for `mode` against everything `registry` holds.
///
/// Ordering matches [`AdapterRegistry::select`]: category schedule-rank
/// then adapter name (§4.3 step 2). Availability is probed concurrently;
/// an optional adapter that isn't `AVAILABLE` is dropped with a warning,
/// a non-optional one aborts the whole plan (§4.3 step 1).
pub async fn build_plan(registry: &AdapterRegistry, mode: &AuditMode) -> Result<Vec<Arc<dyn ToolAdapter>>, AuditError> {
    let candidates = select_candidates(registry, mode).await?;

    let probes = join_all(candidates.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        async move {
            let status = adapter.probe_availability().await;
            (adapter, status)
        }
    }))
    .await;

    let mut plan = Vec::with_capacity(probes.len());
    for (adapter, status) in probes {
        let meta = adapter.metadata();
        if status.is_available() {
            plan.push(Arc::clone(&adapter));
            continue;
        }

        let reason = unavailable_reason(&status);
        if meta.optional {
            warn!(tool = %meta.name, reason = %reason, "optional adapter unavailable, dropping from plan");
        } else {
            return Err(AuditError::ToolUnavailable { tool: meta.name.clone(), reason });
        }
    }

    if plan.is_empty() {
        return Err(AuditError::NoAdaptersSelected { mode: mode.as_tag().to_string() });
    }

    Ok(plan)
}

async fn select_candidates(registry: &AdapterRegistry, mode: &AuditMode) -> Result<Vec<Arc<dyn ToolAdapter>>, AuditError> {
    let candidates = match mode {
        AuditMode::Quick => registry.select(|m| m.category == ToolCategory::Static).await,
        AuditMode::Standard => registry.select(|m| matches!(m.category, ToolCategory::Static | ToolCategory::Linter)).await,
        AuditMode::Full => registry.select(|_| true).await,
        AuditMode::Custom(names) => registry.select(|m| names.contains(&m.name)).await,
    };

    if candidates.is_empty() {
        return Err(AuditError::NoAdaptersSelected { mode: mode.as_tag().to_string() });
    }

    Ok(candidates)
}

fn unavailable_reason(status: &ToolStatus) -> String {
    match status {
        ToolStatus::Available => unreachable!("caller already filtered on availability"),
        ToolStatus::NotInstalled => "analyzer binary not found".to_string(),
        ToolStatus::VersionMismatch { found, required } => format!("found version {found}, required {required}"),
        ToolStatus::Unavailable { reason } => reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;
    use toka_types::{ContractInput, EnvelopeStatus, RawFindingEnvelope, RawRecord, RunOptions, ToolMetadata};

    struct StubAdapter {
        meta: ToolMetadata,
        status: ToolStatus,
    }

    #[async_trait]
    impl ToolAdapter for StubAdapter {
        fn metadata(&self) -> &ToolMetadata {
            &self.meta
        }

        async fn probe_availability(&self) -> ToolStatus {
            self.status.clone()
        }

        async fn analyze(&self, _input: &ContractInput, _options: &RunOptions, _deadline: Instant) -> RawFindingEnvelope {
            RawFindingEnvelope {
                tool: self.meta.name.clone(),
                status: EnvelopeStatus::Success,
                duration: std::time::Duration::ZERO,
                exit_status: Some(0),
                records: Vec::new(),
                stderr_excerpt: None,
            }
        }

        fn parse(&self, _raw_output: &[u8]) -> Vec<RawRecord> {
            Vec::new()
        }
    }

    fn adapter(name: &str, category: ToolCategory, optional: bool, status: ToolStatus) -> Arc<dyn ToolAdapter> {
        Arc::new(StubAdapter {
            meta: ToolMetadata {
                name: name.to_string(),
                version: "1.0.0".into(),
                category,
                capabilities: Vec::new(),
                optional,
                env_vars: Vec::new(),
                remote_service: false,
            },
            status,
        })
    }

    #[tokio::test]
    async fn quick_mode_selects_only_static_adapters() {
        let registry = AdapterRegistry::new();
        registry.register(adapter("sol-static", ToolCategory::Static, false, ToolStatus::Available)).await;
        registry.register(adapter("sol-lint", ToolCategory::Linter, false, ToolStatus::Available)).await;

        let plan = build_plan(&registry, &AuditMode::Quick).await.expect("plan builds");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].metadata().name, "sol-static");
    }

    #[tokio::test]
    async fn optional_unavailable_adapter_is_dropped_not_fatal() {
        let registry = AdapterRegistry::new();
        registry.register(adapter("sol-static", ToolCategory::Static, true, ToolStatus::Available)).await;
        registry.register(adapter("sol-fuzz", ToolCategory::Dynamic, true, ToolStatus::NotInstalled)).await;

        let plan = build_plan(&registry, &AuditMode::Full).await.expect("plan builds");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].metadata().name, "sol-static");
    }

    #[tokio::test]
    async fn non_optional_unavailable_adapter_aborts_the_plan() {
        let registry = AdapterRegistry::new();
        registry.register(adapter("sol-static", ToolCategory::Static, false, ToolStatus::NotInstalled)).await;

        let err = build_plan(&registry, &AuditMode::Quick).await.unwrap_err();
        assert!(matches!(err, AuditError::ToolUnavailable { tool, .. } if tool == "sol-static"));
    }

    #[tokio::test]
    async fn empty_candidate_set_is_no_adapters_selected() {
        let registry = AdapterRegistry::new();
        let err = build_plan(&registry, &AuditMode::Quick).await.unwrap_err();
        assert!(matches!(err, AuditError::NoAdaptersSelected { .. }));
    }
}
