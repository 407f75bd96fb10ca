//! Adapter registry (C4): registration, lookup, and deterministic listing
//! of [`ToolAdapter`] implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use toka_types::{ToolAdapter, ToolMetadata};

use crate::errors::RegistryError;

/// Thread-safe registry of adapter instances, keyed by adapter name.
///
/// Registration is idempotent: registering a name that already exists
/// replaces the previous instance and logs a warning rather than failing,
/// since a long-lived orchestration process may want to hot-swap an
/// adapter's configuration without a restart.
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn ToolAdapter>>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self { adapters: RwLock::new(HashMap::new()) }
    }
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Overrides any prior registration under the
    /// same name, logging a warning when that happens.
    pub async fn register(&self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.metadata().name.clone();
        let mut map = self.adapters.write().await;
        if map.insert(name.clone(), adapter).is_some() {
            warn!(adapter = %name, "replaced an already-registered adapter");
        } else {
            info!(adapter = %name, "registered adapter");
        }
    }

    /// Fetch an adapter by name.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn ToolAdapter>, RegistryError> {
        self.adapters
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { name: name.to_string() })
    }

    /// List metadata for every registered adapter, ordered by category
    /// schedule rank then by name, matching the plan-construction order
    /// the orchestrator uses for scheduling.
    pub async fn list(&self) -> Vec<ToolMetadata> {
        let map = self.adapters.read().await;
        let mut metas: Vec<ToolMetadata> = map.values().map(|a| a.metadata().clone()).collect();
        sort_by_schedule(&mut metas);
        metas
    }

    /// Select the adapters matching a predicate over their metadata,
    /// in the same deterministic order as [`AdapterRegistry::list`].
    pub async fn select<F>(&self, mut predicate: F) -> Vec<Arc<dyn ToolAdapter>>
    where
        F: FnMut(&ToolMetadata) -> bool,
    {
        let map = self.adapters.read().await;
        let mut selected: Vec<Arc<dyn ToolAdapter>> =
            map.values().filter(|a| predicate(a.metadata())).cloned().collect();
        selected.sort_by(|a, b| {
            let (ma, mb) = (a.metadata(), b.metadata());
            ma.category.schedule_rank().cmp(&mb.category.schedule_rank()).then_with(|| ma.name.cmp(&mb.name))
        });
        selected
    }

    /// Number of registered adapters.
    pub async fn len(&self) -> usize {
        self.adapters.read().await.len()
    }

    /// Whether the registry holds no adapters.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sort_by_schedule(metas: &mut [ToolMetadata]) {
    metas.sort_by(|a, b| a.category.schedule_rank().cmp(&b.category.schedule_rank()).then_with(|| a.name.cmp(&b.name)));
}
