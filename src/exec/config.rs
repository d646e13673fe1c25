//! Execution settings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How batches are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Merge every batch into one locked working set as it arrives.
    #[default]
    InMemory,
    /// Encode occurrences on ingest and reduce them in parallel at the end.
    Bitcode,
}

/// Cooperative cancellation flag shared between a caller and a context.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for an execution context.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub strategy: Strategy,
    /// Worker threads for parallel reduction; 0 lets rayon decide.
    pub threads: usize,
    /// Report template and base lists that disagree between occurrences.
    pub check_conflicts: bool,
    pub cancel: CancelToken,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_check_conflicts(mut self, check: bool) -> Self {
        self.check_conflicts = check;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.strategy, Strategy::InMemory);
        assert_eq!(config.threads, 0);
        assert!(!config.check_conflicts);
        assert!(!config.cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared() {
        let token = CancelToken::new();
        let config = Config::new().with_cancel(token.clone());
        token.cancel();
        assert!(config.cancel.is_cancelled());
    }
}
