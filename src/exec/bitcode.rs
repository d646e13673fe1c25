//! Bitcode execution: encode on ingest, reduce in parallel on finish.

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::config::Config;
use super::ExecutionContext;
use crate::base::SymbolId;
use crate::bitcode::{decode, encode_info};
use crate::corpus::Corpus;
use crate::error::{ExecError, GroupError, GroupErrorKind};
use crate::hir::{Batch, Conflict, DiagnosticCollector, Info, UnresolvedSet, conflicts, reduce};

/// One encoded occurrence of a symbol.
#[derive(Clone, Debug)]
pub(crate) struct Occurrence {
    pub(crate) hash: blake3::Hash,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Index {
    groups: FxHashMap<SymbolId, Vec<Occurrence>>,
    diagnostics: DiagnosticCollector,
    /// Identities batches referred to without producing them.
    pending: FxHashSet<SymbolId>,
    occurrences: usize,
    duplicates: usize,
}

impl Index {
    /// Add an occurrence unless the same bytes are already filed under `id`.
    fn insert(&mut self, id: SymbolId, bytes: Vec<u8>) -> bool {
        let hash = blake3::hash(&bytes);
        let group = self.groups.entry(id).or_default();
        if group.iter().any(|o| o.hash == hash) {
            self.duplicates += 1;
            return false;
        }
        group.push(Occurrence { hash, bytes });
        self.occurrences += 1;
        true
    }
}

/// Files every record as an encoded occurrence under its identity and
/// defers all merging to [`ExecutionContext::finish`].
///
/// Identical occurrences, e.g. a header seen by many translation units,
/// are stored once. Occurrences can also come from another process
/// through [`BitcodeStore`](super::BitcodeStore).
#[derive(Debug)]
pub struct BitcodeExecutionContext {
    index: Mutex<Index>,
    config: Config,
}

impl BitcodeExecutionContext {
    pub fn new(config: Config) -> Self {
        Self {
            index: Mutex::new(Index::default()),
            config,
        }
    }

    /// Number of distinct identities seen.
    pub fn len(&self) -> usize {
        self.index.lock().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().groups.is_empty()
    }

    /// Number of distinct occurrences stored.
    pub fn occurrences(&self) -> usize {
        self.index.lock().occurrences
    }

    /// File an already encoded occurrence. Returns `false` for a duplicate.
    pub(crate) fn insert_encoded(&self, id: SymbolId, bytes: Vec<u8>) -> bool {
        self.index.lock().insert(id, bytes)
    }

    /// Copy out every stored occurrence.
    pub(crate) fn snapshot(&self) -> Vec<(SymbolId, Vec<Occurrence>)> {
        self.index
            .lock()
            .groups
            .iter()
            .map(|(id, group)| (*id, group.clone()))
            .collect()
    }
}

impl ExecutionContext for BitcodeExecutionContext {
    fn ingest(&self, batch: Batch) {
        let (set, diagnostics) = batch.into_parts();
        // Encode outside the lock.
        let encoded: Vec<(SymbolId, Vec<u8>)> =
            set.iter().map(|info| (info.id(), encode_info(info))).collect();

        let mut index = self.index.lock();
        index.diagnostics.merge_and_report(diagnostics);
        index.pending.extend(set.unresolved());
        let records = encoded.len();
        let mut fresh = 0usize;
        for (id, bytes) in encoded {
            if index.insert(id, bytes) {
                fresh += 1;
            }
        }
        tracing::debug!(records, fresh, groups = index.groups.len(), "ingested batch as bitcode");
    }

    fn finish(self) -> Result<Corpus, ExecError> {
        let Index {
            groups,
            mut diagnostics,
            pending,
            occurrences,
            duplicates,
        } = self.index.into_inner();
        let cancel = self.config.cancel.clone();
        let check_conflicts = self.config.check_conflicts;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;
        tracing::info!(
            groups = groups.len(),
            occurrences,
            duplicates,
            threads = pool.current_num_threads(),
            "reducing bitcode groups"
        );

        let result = Mutex::new(UnresolvedSet::new());
        let errors: Mutex<Vec<GroupError>> = Mutex::new(Vec::new());
        let found: Mutex<Vec<Conflict>> = Mutex::new(Vec::new());

        let groups: Vec<(SymbolId, Vec<Occurrence>)> = groups.into_iter().collect();
        pool.install(|| {
            groups.into_par_iter().for_each(|(id, group)| {
                if cancel.is_cancelled() {
                    return;
                }
                match reduce_group(&group, check_conflicts) {
                    Ok((info, conflicts)) => {
                        if !conflicts.is_empty() {
                            found.lock().extend(conflicts);
                        }
                        if let Err(err) = result.lock().emplace(info) {
                            errors.lock().push(GroupError {
                                id,
                                error: err.into(),
                            });
                        }
                    }
                    Err(error) => errors.lock().push(GroupError { id, error }),
                }
            });
        });

        if cancel.is_cancelled() {
            tracing::info!("bitcode reduction cancelled");
            return Err(ExecError::Cancelled);
        }

        let mut errors = errors.into_inner();
        if !errors.is_empty() {
            errors.sort_unstable_by_key(|e| e.id);
            for e in &errors {
                tracing::error!(symbol = %e.id, error = %e.error, "symbol group failed to reduce");
            }
            return Err(ExecError::Reduce { errors });
        }

        let mut found = found.into_inner();
        found.sort_unstable_by_key(|c| c.id);
        diagnostics.merge_and_report(found.iter().map(Conflict::to_diagnostic));

        let mut set = result.into_inner();
        for id in pending {
            set.reference(id);
        }
        Ok(Corpus::from_set(set, diagnostics))
    }
}

/// Decode and reduce every occurrence of one identity.
fn reduce_group(
    group: &[Occurrence],
    check_conflicts: bool,
) -> Result<(Info, Vec<Conflict>), GroupErrorKind> {
    let mut infos = Vec::with_capacity(group.len());
    for occurrence in group {
        infos.extend(decode(&occurrence.bytes)?);
    }
    let mut found = Vec::new();
    if check_conflicts {
        if let Some((first, rest)) = infos.split_first() {
            for other in rest {
                found.extend(conflicts(first, other));
            }
        }
    }
    Ok((reduce(infos)?, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CancelToken;
    use crate::hir::{BatchBuilder, FunctionInfo, InfoKind, NamespaceInfo, codes};

    fn sid(usr: &str) -> SymbolId {
        SymbolId::from_usr(usr).unwrap()
    }

    fn namespace(id: SymbolId, name: &str, child: SymbolId) -> Info {
        let mut ns = NamespaceInfo::new(id);
        ns.base.name = name.into();
        ns.members.insert(child);
        ns.into()
    }

    #[test]
    fn test_grouped_reduction() {
        let n = sid("c:@N@n");
        let (f1, f2) = (sid("c:@N@n@F@f1"), sid("c:@N@n@F@f2"));
        let ctx = BitcodeExecutionContext::new(Config::new().with_threads(2));
        ctx.ingest(Batch::from_infos([namespace(n, "foo", f1)]));
        ctx.ingest(Batch::from_infos([namespace(n, "", f2)]));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.occurrences(), 2);

        let corpus = ctx.finish().unwrap();
        let Info::Namespace(ns) = corpus.get(n).unwrap() else {
            panic!("expected a namespace");
        };
        assert_eq!(ns.base.name, "foo");
        assert!(ns.members.contains(&f1) && ns.members.contains(&f2));
        assert_eq!(ns.members.len(), 2);
    }

    #[test]
    fn test_identical_occurrences_stored_once() {
        let f = Info::from(FunctionInfo::new(sid("c:@F@f")));
        let ctx = BitcodeExecutionContext::new(Config::new());
        for _ in 0..3 {
            ctx.ingest(Batch::from_infos([f.clone()]));
        }
        assert_eq!(ctx.occurrences(), 1);
    }

    #[test]
    fn test_corrupt_group_is_isolated() {
        let good = sid("c:@F@good");
        let bad = sid("c:@F@bad");
        let ctx = BitcodeExecutionContext::new(Config::new());
        ctx.ingest(Batch::from_infos([Info::new(good, InfoKind::Function)]));
        assert!(ctx.insert_encoded(bad, b"SYMB\x07\xff\xff\xff\xff".to_vec()));

        let Err(ExecError::Reduce { errors }) = ctx.finish() else {
            panic!("expected a reduce error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, bad);
        assert!(matches!(errors[0].error, GroupErrorKind::Format(_)));
    }

    #[test]
    fn test_kind_clash_fails_group() {
        let id = sid("c:@x");
        let ctx = BitcodeExecutionContext::new(Config::new());
        ctx.ingest(Batch::from_infos([Info::new(id, InfoKind::Variable)]));
        ctx.ingest(Batch::from_infos([Info::new(id, InfoKind::Function)]));
        let Err(ExecError::Reduce { errors }) = ctx.finish() else {
            panic!("expected a reduce error");
        };
        assert!(matches!(errors[0].error, GroupErrorKind::Merge(_)));
    }

    #[test]
    fn test_cancelled_before_finish() {
        let cancel = CancelToken::new();
        let ctx = BitcodeExecutionContext::new(Config::new().with_cancel(cancel.clone()));
        ctx.ingest(Batch::from_infos([Info::new(sid("c:@F@f"), InfoKind::Function)]));
        cancel.cancel();
        assert!(matches!(ctx.finish(), Err(ExecError::Cancelled)));
    }

    #[test]
    fn test_batch_references_carried_to_finish() {
        let (f, later, never) = (sid("c:@F@f"), sid("c:@S@Later"), sid("c:@S@Never"));
        let ctx = BitcodeExecutionContext::new(Config::new());

        let mut first = BatchBuilder::new();
        first.get_or_create(f, InfoKind::Function).unwrap();
        first.add_reference(f, later);
        first.add_reference(f, never);
        ctx.ingest(first.finish());
        ctx.ingest(Batch::from_infos([Info::new(later, InfoKind::Record)]));

        let corpus = ctx.finish().unwrap();
        assert_eq!(corpus.unresolved(), &[never]);
    }

    #[test]
    fn test_producer_diagnostics_survive() {
        let ctx = BitcodeExecutionContext::new(Config::new());
        let batch = Batch::from_infos([Info::new(sid("c:@F@f"), InfoKind::Function)])
            .with_diagnostics([crate::hir::Diagnostic::warning("odd").with_code(codes::IDENTITY_UNAVAILABLE)]);
        ctx.ingest(batch);
        let corpus = ctx.finish().unwrap();
        assert!(corpus
            .diagnostics()
            .iter()
            .any(|d| d.code.as_deref() == Some(codes::IDENTITY_UNAVAILABLE)));
    }
}
