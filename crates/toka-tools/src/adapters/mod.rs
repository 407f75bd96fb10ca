//! Concrete adapter implementations shipped with this crate: five
//! subprocess-backed analyzers plus one LLM-backed reviewer (§4.2).

pub mod external;
pub mod sol_ai_review;
pub mod sol_formal;
pub mod sol_fuzz;
pub mod sol_lint;
pub mod sol_static;
pub mod sol_symbolic;

use std::sync::Arc;

use toka_llm_gateway::LlmGateway;
use toka_types::ToolAdapter;

use crate::registry::AdapterRegistry;

/// Register the five subprocess adapters. Does not register `sol-ai-review`,
/// since that one needs a configured [`LlmGateway`] — call
/// [`register_ai_review`] separately once a gateway is available.
pub async fn register_subprocess_adapters(registry: &AdapterRegistry) {
    let adapters: Vec<Arc<dyn ToolAdapter>> = vec![
        Arc::new(sol_static::adapter()),
        Arc::new(sol_lint::adapter()),
        Arc::new(sol_fuzz::adapter()),
        Arc::new(sol_symbolic::adapter()),
        Arc::new(sol_formal::adapter()),
    ];
    for adapter in adapters {
        registry.register(adapter).await;
    }
}

/// Register `sol-ai-review` against a configured gateway.
pub async fn register_ai_review(registry: &AdapterRegistry, gateway: LlmGateway) {
    registry.register(Arc::new(sol_ai_review::SolAiReviewAdapter::new(gateway))).await;
}
