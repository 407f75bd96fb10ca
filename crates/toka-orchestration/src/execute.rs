//! Bounded-parallelism adapter execution (§4.3 "Execution policy", §5).
//!
//! Adapters run as independent tasks gated by a semaphore sized to the
//! parallelism cap; each acquires its permit, is handed its own deadline,
//! and completes (or times out) without blocking the others. Completion
//! order is not guaranteed to match plan order — the Normalizer/Correlation
//! stages that follow are batch operations and don't care.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::warn;

use toka_types::{ContractInput, RawFindingEnvelope, RunOptions, ToolAdapter};

use crate::cancellation::CancellationToken;

/// Floor on the parallelism cap when `options.parallelism_cap` is unset and
/// the host reports fewer than this many logical CPUs (§4.3 "minimum 2").
const MIN_PARALLELISM: usize = 2;

/// How often an in-flight adapter's cancellation status is re-checked
/// against its running future (§5, ≤5s cancellation-latency bound).
const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(200);

type BoxedFuture = Pin<Box<dyn Future<Output = RawFindingEnvelope> + Send>>;

/// Run every adapter in `plan`, honoring `options`'s parallelism cap and
/// deadlines, and `cancellation` for cooperative early exit.
///
/// Returns one envelope per adapter in `plan`, in completion order (not
/// plan order); a skipped-due-to-cancellation adapter yields an
/// `UNAVAILABLE` envelope rather than being omitted, so `per_tool` still
/// accounts for every planned adapter.
pub async fn execute_plan(
    plan: Vec<Arc<dyn ToolAdapter>>,
    input: &ContractInput,
    options: &RunOptions,
    cancellation: &CancellationToken,
) -> Vec<RawFindingEnvelope> {
    let cap = options.parallelism_cap.unwrap_or_else(default_parallelism).max(1);
    let semaphore = Arc::new(Semaphore::new(cap));
    let global_deadline = options.global_deadline_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));

    let mut in_flight: FuturesUnordered<BoxedFuture> = FuturesUnordered::new();

    for adapter in plan {
        let name = adapter.metadata().name.clone();

        if cancellation.is_cancelled() {
            warn!(tool = %name, "audit cancelled, skipping remaining adapters");
            let fut: BoxedFuture = Box::pin(async move { RawFindingEnvelope::unavailable(name) });
            in_flight.push(fut);
            continue;
        }

        let deadline = effective_deadline(&name, options, global_deadline);
        let semaphore = Arc::clone(&semaphore);
        let input = input.clone();
        let options = options.clone();
        let cancellation = cancellation.clone();

        let fut: BoxedFuture = Box::pin(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            if cancellation.is_cancelled() {
                warn!(tool = %name, "audit cancelled while queued, skipping");
                return RawFindingEnvelope::unavailable(name);
            }

            let started = Instant::now();
            let analysis = adapter.analyze(&input, &options, deadline);
            tokio::pin!(analysis);

            loop {
                tokio::select! {
                    envelope = &mut analysis => break envelope,
                    _ = tokio::time::sleep(CANCELLATION_POLL_INTERVAL) => {
                        if cancellation.is_cancelled() {
                            warn!(tool = %name, elapsed_ms = started.elapsed().as_millis(), "cancelled mid-flight, dropping adapter future");
                            break RawFindingEnvelope::unavailable(name);
                        }
                    }
                }
            }
        });
        in_flight.push(fut);
    }

    let mut results = Vec::with_capacity(in_flight.len());
    while let Some(envelope) = in_flight.next().await {
        results.push(envelope);
    }
    results
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(MIN_PARALLELISM).max(MIN_PARALLELISM)
}

/// `min(tool-specific default, options.per_tool_timeout, remaining global
/// budget)` (§4.3 step 3). A tool-specific default is read from
/// `tool_flags[name]["timeout_seconds"]` when present; adapters with no
/// such override fall back to `options.timeout_seconds`.
fn effective_deadline(name: &str, options: &RunOptions, global_deadline: Option<Instant>) -> Instant {
    let mut budget = Duration::from_secs(options.timeout_seconds);
    if let Some(per_tool) = options.per_tool_timeout {
        budget = budget.min(per_tool);
    }
    if let Some(tool_specific) = tool_specific_timeout(name, options) {
        budget = budget.min(tool_specific);
    }

    let mut deadline = Instant::now() + budget;
    if let Some(global) = global_deadline {
        deadline = deadline.min(global);
    }
    deadline
}

fn tool_specific_timeout(name: &str, options: &RunOptions) -> Option<Duration> {
    let seconds: u64 = options.tool_flags.get(name)?.get("timeout_seconds")?.parse().ok()?;
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toka_types::{EnvelopeStatus, RawRecord, ToolCategory, ToolMetadata, ToolStatus};

    struct CountingAdapter {
        meta: ToolMetadata,
        active: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolAdapter for CountingAdapter {
        fn metadata(&self) -> &ToolMetadata {
            &self.meta
        }

        async fn probe_availability(&self) -> ToolStatus {
            ToolStatus::Available
        }

        async fn analyze(&self, _input: &ContractInput, _options: &RunOptions, _deadline: Instant) -> RawFindingEnvelope {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            RawFindingEnvelope {
                tool: self.meta.name.clone(),
                status: EnvelopeStatus::Success,
                duration: Duration::ZERO,
                exit_status: Some(0),
                records: Vec::new(),
                stderr_excerpt: None,
            }
        }

        fn parse(&self, _raw_output: &[u8]) -> Vec<RawRecord> {
            Vec::new()
        }
    }

    fn adapter(name: &str, active: Arc<AtomicUsize>, max_seen: Arc<AtomicUsize>) -> Arc<dyn ToolAdapter> {
        Arc::new(CountingAdapter {
            meta: ToolMetadata {
                name: name.to_string(),
                version: "1.0.0".into(),
                category: ToolCategory::Static,
                capabilities: Vec::new(),
                optional: false,
                env_vars: Vec::new(),
                remote_service: false,
            },
            active,
            max_seen,
        })
    }

    fn input() -> ContractInput {
        ContractInput { path: "/proj/a.sol".into(), language_version: None, project_root: None }
    }

    #[tokio::test]
    async fn respects_the_parallelism_cap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let plan: Vec<Arc<dyn ToolAdapter>> = (0..6).map(|i| adapter(&format!("tool-{i}"), Arc::clone(&active), Arc::clone(&max_seen))).collect();

        let mut options = RunOptions::default();
        options.parallelism_cap = Some(2);

        let results = execute_plan(plan, &input(), &options, &CancellationToken::new()).await;

        assert_eq!(results.len(), 6);
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_every_adapter() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let plan: Vec<Arc<dyn ToolAdapter>> = vec![adapter("tool-a", Arc::clone(&active), Arc::clone(&max_seen))];

        let token = CancellationToken::new();
        token.cancel();

        let results = execute_plan(plan, &input(), &RunOptions::default(), &token).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, EnvelopeStatus::Unavailable);
        assert_eq!(max_seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tool_specific_timeout_overrides_the_global_default() {
        let mut options = RunOptions::default();
        options.timeout_seconds = 100;
        let mut flags = HashMap::new();
        flags.insert("timeout_seconds".to_string(), "5".to_string());
        options.tool_flags.insert("slow-tool".to_string(), flags);

        let now = Instant::now();
        let deadline = effective_deadline("slow-tool", &options, None);
        assert!(deadline.duration_since(now) <= Duration::from_secs(5));
    }

    #[test]
    fn global_deadline_bounds_the_effective_deadline() {
        let options = RunOptions::default();
        let now = Instant::now();
        let global = now + Duration::from_secs(3);
        let deadline = effective_deadline("any-tool", &options, Some(global));
        assert!(deadline <= global);
    }

    struct SlowAdapter {
        meta: ToolMetadata,
    }

    #[async_trait]
    impl ToolAdapter for SlowAdapter {
        fn metadata(&self) -> &ToolMetadata {
            &self.meta
        }

        async fn probe_availability(&self) -> ToolStatus {
            ToolStatus::Available
        }

        async fn analyze(&self, _input: &ContractInput, _options: &RunOptions, _deadline: Instant) -> RawFindingEnvelope {
            tokio::time::sleep(Duration::from_secs(30)).await;
            RawFindingEnvelope {
                tool: self.meta.name.clone(),
                status: EnvelopeStatus::Success,
                duration: Duration::ZERO,
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
    async fn cancellation_mid_flight_bounds_latency() {
        let slow: Arc<dyn ToolAdapter> = Arc::new(SlowAdapter {
            meta: ToolMetadata {
                name: "slow-tool".to_string(),
                version: "1.0.0".into(),
                category: ToolCategory::Static,
                capabilities: Vec::new(),
                optional: false,
                env_vars: Vec::new(),
                remote_service: false,
            },
        });

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let results = execute_plan(vec![slow], &input(), &RunOptions::default(), &token).await;
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, EnvelopeStatus::Unavailable);
        assert!(elapsed < Duration::from_secs(2), "cancellation took too long: {elapsed:?}");
    }
}
