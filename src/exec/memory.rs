//! In-memory execution: one locked working set.

use parking_lot::RwLock;

use super::config::Config;
use super::{ExecutionContext, merge_failed};
use crate::base::SymbolId;
use crate::corpus::Corpus;
use crate::error::ExecError;
use crate::hir::{Batch, DiagnosticCollector, Info, UnresolvedSet, conflicts};

/// Merges each batch into a shared working set as soon as it arrives.
///
/// `ingest` may be called from any number of producer threads; the
/// working set is behind a single read/write lock.
#[derive(Debug)]
pub struct InfoExecutionContext {
    inner: RwLock<Inner>,
    config: Config,
}

#[derive(Debug, Default)]
struct Inner {
    set: UnresolvedSet,
    diagnostics: DiagnosticCollector,
    batches: usize,
}

impl InfoExecutionContext {
    pub fn new(config: Config) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// Number of records merged so far.
    pub fn len(&self) -> usize {
        self.inner.read().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().set.is_empty()
    }

    /// Look up a merged record while ingestion is still running.
    pub fn get(&self, id: SymbolId) -> Option<Info> {
        self.inner.read().set.find(id).cloned()
    }
}

impl ExecutionContext for InfoExecutionContext {
    fn ingest(&self, batch: Batch) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if self.config.check_conflicts {
            for info in batch.infos() {
                if let Some(existing) = inner.set.find(info.id()) {
                    for conflict in conflicts(existing, info) {
                        inner.diagnostics.merge_and_report([conflict.to_diagnostic()]);
                    }
                }
            }
        }

        let (mut set, diagnostics) = batch.into_parts();
        let records = set.len();
        inner.diagnostics.merge_and_report(diagnostics);

        // Slots the batch left open may already be satisfiable here.
        set.resolve_against(&inner.set);
        let absorbed = inner.set.absorb(set);
        inner
            .diagnostics
            .merge_and_report(absorbed.errors.iter().map(merge_failed));

        inner.batches += 1;
        tracing::debug!(
            batch = inner.batches,
            records,
            total = inner.set.len(),
            pending = inner.set.pending_count(),
            "ingested batch"
        );
    }

    fn finish(self) -> Result<Corpus, ExecError> {
        if self.config.cancel.is_cancelled() {
            tracing::info!("in-memory execution cancelled");
            return Err(ExecError::Cancelled);
        }
        let inner = self.inner.into_inner();
        Ok(Corpus::from_set(inner.set, inner.diagnostics))
    }
}
