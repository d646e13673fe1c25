//! Batch construction for extractors.
//!
//! An extractor walks one translation unit and calls into a
//! [`BatchBuilder`] for every declaration it sees. The builder keeps the
//! records of that unit merged by identity, wires children to parents and
//! tracks references to symbols the unit has not produced (yet).

use super::diagnostics::{Diagnostic, codes};
use super::info::{Info, InfoKind};
use super::input::Batch;
use super::resolve::{SlotId, UnresolvedSet};
use crate::base::{Location, SymbolId};
use crate::error::{IdentityError, MergeError};

/// Accumulates one extraction pass into a [`Batch`].
#[derive(Debug)]
pub struct BatchBuilder {
    set: UnresolvedSet,
    diagnostics: Vec<Diagnostic>,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBuilder {
    /// Create a builder seeded with the global namespace.
    pub fn new() -> Self {
        Self {
            set: UnresolvedSet::with_global_namespace(),
            diagnostics: Vec::new(),
        }
    }

    /// Derive the identity for a declaration.
    ///
    /// On failure the declaration should be skipped; a diagnostic is
    /// recorded and `None` returned.
    pub fn identity(&mut self, usr: &str, location: Option<&Location>) -> Option<SymbolId> {
        match SymbolId::from_usr(usr) {
            Ok(id) => Some(id),
            Err(err) => {
                self.identity_failed(usr, location.cloned(), &err);
                None
            }
        }
    }

    /// Record that a declaration could not be given an identity.
    pub fn identity_failed(&mut self, usr: &str, location: Option<Location>, error: &IdentityError) {
        tracing::debug!(usr, error = %error, "skipping declaration without identity");
        let mut diagnostic = Diagnostic::warning(format!("declaration skipped: {error}"))
            .with_code(codes::IDENTITY_UNAVAILABLE);
        if let Some(location) = location {
            diagnostic = diagnostic.with_location(location);
        }
        self.diagnostics.push(diagnostic);
    }

    /// Get the record for `id`, creating it if this is its first mention.
    pub fn get_or_create(&mut self, id: SymbolId, kind: InfoKind) -> Result<&mut Info, MergeError> {
        self.set.get_or_create(id, kind)
    }

    /// Add a complete record, merging it with what is already known.
    pub fn emplace(&mut self, info: Info) -> Result<(), MergeError> {
        self.set.emplace(info)
    }

    pub fn find(&self, id: SymbolId) -> Option<&Info> {
        self.set.find(id)
    }

    /// Register `child`, declared as `kind`, with `parent`.
    ///
    /// The parent must already exist. The child need not: a child that
    /// has not been created yet goes into the ordinary member set and
    /// the identity resolves once some batch produces it. A known child
    /// that is a specialization goes to the parent's specialization
    /// bucket when the parent kind has one, and a known child with no
    /// enclosing scopes yet inherits `parent` and its scopes.
    ///
    /// Returns `Ok(false)` if the child was already registered or the
    /// parent kind cannot own children.
    pub fn emplace_child(
        &mut self,
        parent: SymbolId,
        child: SymbolId,
        kind: InfoKind,
    ) -> Result<bool, MergeError> {
        if !self.set.contains(parent) {
            return Err(MergeError::MissingParent { parent, child });
        }
        let is_specialization = match self.set.find(child) {
            Some(info) if info.kind() != kind => {
                return Err(MergeError::KindMismatch {
                    id: child,
                    left: info.kind(),
                    right: kind,
                });
            }
            Some(info) => info.is_specialization(),
            None => {
                tracing::trace!(parent = %parent, child = %child, "child registered before creation");
                self.set.reference(child);
                false
            }
        };
        let Some(parent_info) = self.set.find_mut(parent) else {
            return Ok(false);
        };

        let to_bucket = is_specialization && parent_info.kind().has_specializations();
        let inserted = parent_info.insert_child(child, kind, to_bucket);

        let mut scopes = Vec::with_capacity(parent_info.base().parents.len() + 1);
        scopes.push(parent);
        scopes.extend(parent_info.base().parents.iter().copied());
        if let Some(child_info) = self.set.find_mut(child) {
            if child_info.base().parents.is_empty() {
                child_info.base_mut().parents = scopes;
            }
        }
        Ok(inserted)
    }

    /// Note that `from` refers to `to`.
    ///
    /// The returned slot resolves once `to` is emplaced in this batch or
    /// in whatever working set the batch is merged into.
    pub fn add_reference(&mut self, from: SymbolId, to: SymbolId) -> SlotId {
        let slot = self.set.reference(to);
        if self.set.slot(slot).is_none() {
            tracing::trace!(from = %from, to = %to, "forward reference");
        }
        slot
    }

    /// Whether a slot handed out by [`BatchBuilder::add_reference`] has resolved.
    pub fn slot(&self, slot: SlotId) -> Option<SymbolId> {
        self.set.slot(slot)
    }

    /// Record a diagnostic from the extractor.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Finish the pass.
    pub fn finish(self) -> Batch {
        tracing::debug!(
            infos = self.set.len(),
            pending = self.set.pending_count(),
            diagnostics = self.diagnostics.len(),
            "batch built"
        );
        Batch::from_parts(self.set, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::TemplateInfo;

    fn sid(usr: &str) -> SymbolId {
        SymbolId::from_usr(usr).unwrap()
    }

    #[test]
    fn test_seeded_with_global_namespace() {
        let builder = BatchBuilder::new();
        let global = builder.find(SymbolId::GLOBAL).unwrap();
        assert_eq!(global.kind(), InfoKind::Namespace);
    }

    #[test]
    fn test_emplace_child_sets_parents() {
        let mut builder = BatchBuilder::new();
        builder.get_or_create(sid("ns"), InfoKind::Namespace).unwrap();
        builder
            .emplace_child(SymbolId::GLOBAL, sid("ns"), InfoKind::Namespace)
            .unwrap();
        builder.get_or_create(sid("f"), InfoKind::Function).unwrap();
        assert!(builder.emplace_child(sid("ns"), sid("f"), InfoKind::Function).unwrap());
        assert!(!builder.emplace_child(sid("ns"), sid("f"), InfoKind::Function).unwrap());

        let f = builder.find(sid("f")).unwrap();
        assert_eq!(f.base().parents, vec![sid("ns"), SymbolId::GLOBAL]);
    }

    #[test]
    fn test_emplace_child_specialization_bucket() {
        let mut builder = BatchBuilder::new();
        builder.get_or_create(sid("ns"), InfoKind::Namespace).unwrap();
        let Info::Record(spec) = builder.get_or_create(sid("spec"), InfoKind::Record).unwrap() else {
            unreachable!()
        };
        spec.template = Some(TemplateInfo {
            primary: sid("primary"),
            ..Default::default()
        });
        builder
            .emplace_child(sid("ns"), sid("spec"), InfoKind::Record)
            .unwrap();

        let ns = builder.find(sid("ns")).unwrap();
        assert!(ns.members().unwrap().is_empty());
        assert!(ns.specializations().unwrap().contains(&sid("spec")));
    }

    #[test]
    fn test_emplace_child_before_creation() {
        let mut builder = BatchBuilder::new();
        builder.get_or_create(sid("ns"), InfoKind::Namespace).unwrap();
        assert!(builder.emplace_child(sid("ns"), sid("c"), InfoKind::Record).unwrap());

        let ns = builder.find(sid("ns")).unwrap();
        assert!(ns.members().unwrap().contains(&sid("c")));
        assert_eq!(builder.set.unresolved().collect::<Vec<_>>(), vec![sid("c")]);

        builder.get_or_create(sid("c"), InfoKind::Record).unwrap();
        assert_eq!(builder.set.pending_count(), 0);
    }

    #[test]
    fn test_emplace_child_requires_parent() {
        let mut builder = BatchBuilder::new();
        assert_eq!(
            builder.emplace_child(sid("ns"), sid("f"), InfoKind::Function),
            Err(MergeError::MissingParent {
                parent: sid("ns"),
                child: sid("f"),
            })
        );
        assert_eq!(builder.set.pending_count(), 0);
    }

    #[test]
    fn test_emplace_child_kind_hint_must_match() {
        let mut builder = BatchBuilder::new();
        builder.get_or_create(sid("f"), InfoKind::Function).unwrap();
        assert!(matches!(
            builder.emplace_child(SymbolId::GLOBAL, sid("f"), InfoKind::Variable),
            Err(MergeError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_kind_clash() {
        let mut builder = BatchBuilder::new();
        builder.get_or_create(sid("x"), InfoKind::Field).unwrap();
        assert!(builder.get_or_create(sid("x"), InfoKind::Enum).is_err());
    }

    #[test]
    fn test_identity_failure_is_reported() {
        let mut builder = BatchBuilder::new();
        assert_eq!(builder.identity("", Some(&Location::new("a.cpp", 4))), None);

        let batch = builder.finish();
        assert_eq!(batch.diagnostics().len(), 1);
        assert_eq!(
            batch.diagnostics()[0].code.as_deref(),
            Some(codes::IDENTITY_UNAVAILABLE)
        );
    }

    #[test]
    fn test_forward_reference_within_batch() {
        let mut builder = BatchBuilder::new();
        let slot = builder.add_reference(SymbolId::GLOBAL, sid("later"));
        assert_eq!(builder.slot(slot), None);

        builder.get_or_create(sid("later"), InfoKind::Record).unwrap();
        assert_eq!(builder.slot(slot), Some(sid("later")));
    }
}
