use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

use async_trait::async_trait;
use toka_types::{
    ContractInput, EnvelopeStatus, RawFindingEnvelope, RawRecord, RunOptions, ToolAdapter,
    ToolCategory, ToolMetadata, ToolStatus,
};

use toka_tools::AdapterRegistry;

struct StubAdapter {
    meta: ToolMetadata,
}

impl StubAdapter {
    fn new(name: &str) -> Self {
        Self {
            meta: ToolMetadata {
                name: name.to_string(),
                version: "0.0.0".into(),
                category: ToolCategory::Static,
                capabilities: Vec::new(),
                optional: true,
                env_vars: Vec::new(),
                remote_service: false,
            },
        }
    }
}

#[async_trait]
impl ToolAdapter for StubAdapter {
    fn metadata(&self) -> &ToolMetadata {
        &self.meta
    }

    async fn probe_availability(&self) -> ToolStatus {
        ToolStatus::Available
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

#[tokio::test]
async fn concurrent_access_is_safe() -> Result<()> {
    let registry = Arc::new(AdapterRegistry::new());
    registry.register(Arc::new(StubAdapter::new("sol-static"))).await;

    let mut handles = vec![];

    for i in 0..10 {
        let registry_clone = Arc::clone(&registry);
        let handle = task::spawn(async move {
            let result = registry_clone.list().await;
            println!("Task {i} completed");
            result
        });
        handles.push(handle);
    }

    for handle in handles {
        let result = handle.await?;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "sol-static");
    }

    Ok(())
}

#[tokio::test]
async fn concurrent_registration_never_loses_or_duplicates_an_adapter() -> Result<()> {
    let registry = Arc::new(AdapterRegistry::new());

    let mut handles = vec![];
    for i in 0..10 {
        let registry_clone = Arc::clone(&registry);
        let handle = task::spawn(async move {
            registry_clone.register(Arc::new(StubAdapter::new(&format!("tool-{i}")))).await;
        });
        handles.push(handle);
    }
    for handle in handles {
        handle.await?;
    }

    assert_eq!(registry.len().await, 10);
    for i in 0..10 {
        assert!(registry.get(&format!("tool-{i}")).await.is_ok());
    }

    Ok(())
}

#[tokio::test]
async fn concurrent_get_and_register_do_not_deadlock() -> Result<()> {
    let registry = Arc::new(AdapterRegistry::new());
    registry.register(Arc::new(StubAdapter::new("sol-static"))).await;

    let readers = Arc::clone(&registry);
    let reader_handle = task::spawn(async move {
        for _ in 0..50 {
            let _ = readers.get("sol-static").await;
        }
    });

    let writers = Arc::clone(&registry);
    let writer_handle = task::spawn(async move {
        for i in 0..10 {
            writers.register(Arc::new(StubAdapter::new(&format!("extra-{i}")))).await;
        }
    });

    reader_handle.await?;
    writer_handle.await?;

    assert_eq!(registry.len().await, 11);
    Ok(())
}
