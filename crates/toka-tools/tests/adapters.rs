use toka_tools::adapters::register_subprocess_adapters;
use toka_tools::AdapterRegistry;

#[tokio::test]
async fn default_subprocess_adapters_register_in_schedule_order() {
    let registry = AdapterRegistry::new();
    register_subprocess_adapters(&registry).await;

    let names: Vec<String> = registry.list().await.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["sol-lint", "sol-static", "sol-fuzz", "sol-symbolic", "sol-formal"]);
}

#[tokio::test]
async fn every_default_adapter_is_optional() {
    let registry = AdapterRegistry::new();
    register_subprocess_adapters(&registry).await;

    for meta in registry.list().await {
        assert!(meta.optional, "adapter '{}' should be optional by default", meta.name);
    }
}
