//! A cooperative cancellation flag shared between a caller and a running
//! audit (§5 "Cancellation & timeouts").
//!
//! The Orchestrator checks this before scheduling each adapter and folds it
//! into the timer tick that drives per-adapter deadlines; it never forcibly
//! interrupts a running future. Cheap to clone — every clone shares the same
//! underlying flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, cooperative "please stop" flag for one audit run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called on this token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancelling_a_clone_is_visible_on_the_original() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
