//! Batches: the unit a producer hands to an execution context.

use super::diagnostics::{Diagnostic, codes};
use super::info::Info;
use super::resolve::UnresolvedSet;

/// The records and diagnostics one extraction pass produced.
///
/// Records inside a batch are already merged by identity; the batch may
/// still carry forward references to identities it never produced.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    set: UnresolvedSet,
    diagnostics: Vec<Diagnostic>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from loose records.
    ///
    /// Repeated identities are merged; records that cannot be merged are
    /// dropped with an error diagnostic.
    pub fn from_infos(infos: impl IntoIterator<Item = Info>) -> Self {
        let mut batch = Self::new();
        for info in infos {
            batch.push(info);
        }
        batch
    }

    pub(crate) fn from_parts(set: UnresolvedSet, diagnostics: Vec<Diagnostic>) -> Self {
        Self { set, diagnostics }
    }

    /// Add a record, merging it with any earlier one of the same identity.
    pub fn push(&mut self, info: Info) {
        let id = info.id();
        if let Err(err) = self.set.emplace(info) {
            self.diagnostics.push(
                Diagnostic::error(err.to_string())
                    .with_code(codes::MERGE_FAILED)
                    .with_symbol(id),
            );
        }
    }

    /// Attach diagnostics to the batch.
    pub fn with_diagnostics(mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    /// Iterate over the records.
    pub fn infos(&self) -> impl Iterator<Item = &Info> {
        self.set.iter()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Check if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Split into the working set and the diagnostics.
    pub fn into_parts(self) -> (UnresolvedSet, Vec<Diagnostic>) {
        (self.set, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SymbolId;
    use crate::hir::{FieldInfo, InfoKind, VariableInfo};

    #[test]
    fn test_batch_merges_duplicates() {
        let id = SymbolId::from_usr("c:@F@x").unwrap();
        let mut first = FieldInfo::new(id);
        first.base.name = "x".into();

        let batch = Batch::from_infos([Info::from(first), Info::new(id, InfoKind::Field)]);

        assert_eq!(batch.len(), 1);
        assert!(batch.diagnostics().is_empty());
        assert_eq!(batch.infos().next().map(Info::name), Some("x"));
    }

    #[test]
    fn test_batch_kind_clash_reported() {
        let id = SymbolId::from_usr("c:@x").unwrap();
        let batch = Batch::from_infos([
            Info::from(FieldInfo::new(id)),
            Info::from(VariableInfo::new(id)),
        ]);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.diagnostics().len(), 1);
        assert_eq!(
            batch.diagnostics()[0].code.as_deref(),
            Some(codes::MERGE_FAILED)
        );
    }
}
