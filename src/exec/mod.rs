//! Execution contexts: where batches from many producers meet.
//!
//! Producers build one [`Batch`] per translation unit and hand it to
//! [`ExecutionContext::ingest`], possibly from many threads at once.
//! [`ExecutionContext::finish`] closes ingestion and yields the
//! [`Corpus`].
//!
//! Two strategies share that contract:
//!
//! - [`InfoExecutionContext`] merges each batch into one working set
//!   under a read/write lock. Nothing is left to do at the end.
//! - [`BitcodeExecutionContext`] encodes each record on arrival and files
//!   it under its identity. `finish` decodes and reduces every identity
//!   group on a worker pool. A group that fails does not stop the others.
//!
//! ```ignore
//! use symgraph::exec::{Config, ExecutionContext, Executor, Strategy};
//!
//! let executor = Executor::new(Config::new().with_strategy(Strategy::Bitcode));
//! rayon::scope(|s| {
//!     for unit in units {
//!         s.spawn(|_| executor.ingest(extract(unit)));
//!     }
//! });
//! let corpus = executor.finish()?;
//! ```

mod bitcode;
mod config;
mod memory;
mod store;

pub use bitcode::BitcodeExecutionContext;
pub use config::{CancelToken, Config, Strategy};
pub use memory::InfoExecutionContext;
pub use store::BitcodeStore;

use crate::corpus::Corpus;
use crate::error::{ExecError, MergeError};
use crate::hir::{Batch, Diagnostic, codes};

/// Common contract of every execution strategy.
pub trait ExecutionContext: Send + Sync {
    /// Hand over one producer's batch.
    fn ingest(&self, batch: Batch);

    /// Close ingestion and produce the merged corpus.
    fn finish(self) -> Result<Corpus, ExecError>
    where
        Self: Sized;
}

/// An execution context chosen at runtime from [`Config::strategy`].
#[derive(Debug)]
pub enum Executor {
    InMemory(InfoExecutionContext),
    Bitcode(BitcodeExecutionContext),
}

impl Executor {
    pub fn new(config: Config) -> Self {
        tracing::debug!(strategy = ?config.strategy, threads = config.threads, "creating executor");
        match config.strategy {
            Strategy::InMemory => Executor::InMemory(InfoExecutionContext::new(config)),
            Strategy::Bitcode => Executor::Bitcode(BitcodeExecutionContext::new(config)),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Executor::InMemory(_) => Strategy::InMemory,
            Executor::Bitcode(_) => Strategy::Bitcode,
        }
    }
}

impl ExecutionContext for Executor {
    fn ingest(&self, batch: Batch) {
        match self {
            Executor::InMemory(ctx) => ctx.ingest(batch),
            Executor::Bitcode(ctx) => ctx.ingest(batch),
        }
    }

    fn finish(self) -> Result<Corpus, ExecError> {
        match self {
            Executor::InMemory(ctx) => ctx.finish(),
            Executor::Bitcode(ctx) => ctx.finish(),
        }
    }
}

fn merge_failed(err: &MergeError) -> Diagnostic {
    let diagnostic = Diagnostic::error(err.to_string()).with_code(codes::MERGE_FAILED);
    match err {
        MergeError::IdMismatch { left: id, .. }
        | MergeError::KindMismatch { id, .. }
        | MergeError::MissingParent { parent: id, .. } => diagnostic.with_symbol(*id),
        MergeError::Empty => diagnostic,
    }
}
