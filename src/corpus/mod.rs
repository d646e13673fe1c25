//! The finished symbol graph, as handed to a renderer.
//!
//! A [`Corpus`] is read-only. Every record is fully merged, locations are
//! sorted and deduplicated, and every reference to an identity nobody
//! extracted is listed in [`Corpus::unresolved`] rather than left dangling.
//!
//! ## Usage
//!
//! ```ignore
//! let corpus = context.finish()?;
//! for info in corpus.sorted() {
//!     println!("{}", corpus.qualified_name(info));
//!     for link in corpus.links(info) {
//!         match link.link {
//!             Link::Resolved(target) => { /* hyperlink */ }
//!             Link::Unresolved(_) => { /* plain text: link.text() */ }
//!         }
//!     }
//! }
//! ```

mod links;

pub use links::{Link, LinkRole, SymbolLink};

use rustc_hash::FxHashMap;

use crate::base::SymbolId;
use crate::hir::{Diagnostic, DiagnosticCollector, Info, Severity, UnresolvedSet, codes};

const UNNAMED: &str = "<unnamed>";

/// Every merged record, keyed by identity.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    infos: FxHashMap<SymbolId, Info>,
    /// Sorted.
    unresolved: Vec<SymbolId>,
    diagnostics: Vec<Diagnostic>,
}

impl Corpus {
    /// Close a working set: open a slot for every outgoing reference,
    /// then report whatever is still pending.
    pub(crate) fn from_set(mut set: UnresolvedSet, mut diagnostics: DiagnosticCollector) -> Self {
        set.link_references();
        let (infos, unresolved) = set.release();
        for id in &unresolved {
            diagnostics.add(
                Diagnostic::warning(format!("reference to symbol {id} was never extracted"))
                    .with_code(codes::UNRESOLVED_REFERENCE)
                    .with_symbol(*id),
            );
        }
        if !unresolved.is_empty() {
            tracing::debug!(unresolved = unresolved.len(), "corpus has unresolved references");
        }
        diagnostics.report_totals(Severity::Warning);
        tracing::info!(symbols = infos.len(), "corpus ready");
        Self {
            infos,
            unresolved,
            diagnostics: diagnostics.into_vec(),
        }
    }

    /// Get a record by identity.
    pub fn get(&self, id: SymbolId) -> Option<&Info> {
        self.infos.get(&id)
    }

    /// Find a record by qualified name, e.g. `ns::R::m`.
    pub fn find(&self, qualified: &str) -> Option<&Info> {
        self.infos
            .values()
            .find(|info| self.qualified_name(info) == qualified)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate over records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Info> {
        self.infos.values()
    }

    /// Records ordered by identity, for deterministic output.
    pub fn sorted(&self) -> Vec<&Info> {
        let mut infos: Vec<&Info> = self.infos.values().collect();
        infos.sort_unstable_by_key(|info| info.id());
        infos
    }

    pub fn global_namespace(&self) -> Option<&Info> {
        self.get(SymbolId::GLOBAL)
    }

    /// Name of `info` with every enclosing scope, joined by `::`.
    ///
    /// The global namespace is left out. Scopes missing from the corpus or
    /// without a name show as `<unnamed>`.
    pub fn qualified_name(&self, info: &Info) -> String {
        let mut parts: Vec<&str> = info
            .base()
            .parents
            .iter()
            .rev()
            .filter(|id| !id.is_global())
            .map(|id| match self.get(*id) {
                Some(parent) if !parent.name().is_empty() => parent.name(),
                _ => UNNAMED,
            })
            .collect();
        parts.push(if info.name().is_empty() {
            UNNAMED
        } else {
            info.name()
        });
        parts.join("::")
    }

    /// Identities referenced somewhere but never extracted, sorted.
    pub fn unresolved(&self) -> &[SymbolId] {
        &self.unresolved
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolve one identity.
    pub fn link(&self, id: SymbolId) -> Link<'_> {
        match self.get(id) {
            Some(info) => Link::Resolved(info),
            None => Link::Unresolved(id),
        }
    }

    /// Every outgoing reference of `info` with its resolution state.
    pub fn links(&self, info: &Info) -> Vec<SymbolLink<'_>> {
        links::outgoing(self, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{FunctionInfo, NamespaceInfo, RecordInfo, TypeInfo};

    fn sid(usr: &str) -> SymbolId {
        SymbolId::from_usr(usr).unwrap()
    }

    fn corpus() -> Corpus {
        let ns = sid("c:@N@ns");
        let rec = sid("c:@N@ns@S@R");
        let m = sid("c:@N@ns@S@R@F@m");

        let mut set = UnresolvedSet::new();
        let mut global = NamespaceInfo::new(SymbolId::GLOBAL);
        global.members.insert(ns);
        set.emplace(global.into()).unwrap();

        let mut n = NamespaceInfo::new(ns);
        n.base.name = "ns".into();
        n.base.parents = vec![SymbolId::GLOBAL];
        n.members.insert(rec);
        set.emplace(n.into()).unwrap();

        let mut r = RecordInfo::new(rec);
        r.base.name = "R".into();
        r.base.parents = vec![ns, SymbolId::GLOBAL];
        r.members.insert(m);
        set.emplace(r.into()).unwrap();

        let mut f = FunctionInfo::new(m);
        f.base.name = "m".into();
        f.base.parents = vec![rec, ns, SymbolId::GLOBAL];
        f.return_type = TypeInfo::new(sid("c:@S@std::string"), "std::string");
        set.emplace(f.into()).unwrap();

        Corpus::from_set(set, DiagnosticCollector::new())
    }

    #[test]
    fn test_qualified_names() {
        let corpus = corpus();
        let m = corpus.get(sid("c:@N@ns@S@R@F@m")).unwrap();
        assert_eq!(corpus.qualified_name(m), "ns::R::m");
        assert_eq!(corpus.find("ns::R").unwrap().id(), sid("c:@N@ns@S@R"));
        assert!(corpus.find("ns::Q").is_none());
    }

    #[test]
    fn test_unknown_parent_is_unnamed() {
        let corpus = corpus();
        let mut orphan = FunctionInfo::new(sid("c:@F@o"));
        orphan.base.name = "o".into();
        orphan.base.parents = vec![sid("c:@N@gone"), SymbolId::GLOBAL];
        assert_eq!(corpus.qualified_name(&orphan.into()), "<unnamed>::o");
    }

    #[test]
    fn test_unresolved_type_is_reported() {
        let corpus = corpus();
        let string = sid("c:@S@std::string");
        assert_eq!(corpus.unresolved(), &[string]);
        assert!(corpus.diagnostics().iter().any(|d| {
            d.code.as_deref() == Some(codes::UNRESOLVED_REFERENCE) && d.symbol == Some(string)
        }));
    }

    #[test]
    fn test_links() {
        let corpus = corpus();
        let m = corpus.get(sid("c:@N@ns@S@R@F@m")).unwrap();
        let links = corpus.links(m);

        let parents: Vec<_> = links.iter().filter(|l| l.role == LinkRole::Parent).collect();
        assert_eq!(parents.len(), 3);
        assert!(parents.iter().all(|l| l.link.is_resolved()));

        let ty = links.iter().find(|l| l.role == LinkRole::Type).unwrap();
        assert_eq!(ty.link, Link::Unresolved(sid("c:@S@std::string")));
        assert_eq!(ty.text(), "std::string");
    }

    #[test]
    fn test_sorted_and_global() {
        let corpus = corpus();
        let ids: Vec<_> = corpus.sorted().iter().map(|i| i.id()).collect();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(ids, expected);
        assert_eq!(corpus.len(), 4);
        assert!(corpus.global_namespace().is_some());
    }
}
