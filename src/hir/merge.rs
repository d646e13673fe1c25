//! Merge engine: combining occurrences of the same symbol.
//!
//! Field policy:
//!
//! | field shape                         | rule                          |
//! |-------------------------------------|-------------------------------|
//! | string, id, small enum              | first non-default wins        |
//! | specifier flags, plain booleans     | logical OR                    |
//! | `Option<T>` (templates, types)      | first `Some` wins             |
//! | lists (params, bases, args)         | first non-empty list wins     |
//! | member and specialization sets      | union by identity             |
//! | friends                             | union, kept sorted            |
//! | locations                           | union, dedup by file+line     |
//! | documentation                       | [`Javadoc::merge`]            |
//!
//! "First" means first in this particular reduction order. Legitimate
//! redeclarations never disagree on such fields, so the order dependence
//! only shows on malformed input; [`conflicts`] finds the structural cases.

use std::fmt;

use indexmap::IndexSet;

use super::diagnostics::{Diagnostic, codes};
use super::info::{
    EnumInfo, EnumeratorInfo, FieldInfo, FriendInfo, FunctionInfo, Info, InfoBase, NamespaceInfo,
    RecordInfo, SpecializationInfo, TypedefInfo, VariableInfo,
};
use super::types::{Javadoc, TemplateInfo};
use crate::base::SymbolId;
use crate::error::MergeError;

// ============================================================================
// FIELD RULES
// ============================================================================

/// Take `src` if `dst` still holds the type's default.
#[inline]
fn fill<T: Default + PartialEq>(dst: &mut T, src: T) {
    if *dst == T::default() {
        *dst = src;
    }
}

#[inline]
fn fill_opt<T>(dst: &mut Option<T>, src: Option<T>) {
    if dst.is_none() {
        *dst = src;
    }
}

/// Union two identity sets, moving `src` wholesale when `dst` is empty.
fn union<T: std::hash::Hash + Eq>(dst: &mut IndexSet<T>, src: IndexSet<T>) {
    if dst.is_empty() {
        *dst = src;
    } else {
        dst.extend(src);
    }
}

fn merge_javadoc(dst: &mut Option<Javadoc>, src: Option<Javadoc>) {
    let Some(src) = src else {
        return;
    };
    match dst {
        Some(d) => d.merge(src),
        None => *dst = Some(src),
    }
}

fn merge_base(dst: &mut InfoBase, src: InfoBase) {
    debug_assert_eq!(dst.id, src.id);
    fill(&mut dst.name, src.name);
    fill(&mut dst.parents, src.parents);
    fill(&mut dst.access, src.access);
    merge_javadoc(&mut dst.javadoc, src.javadoc);
    dst.source.merge(src.source);
}

// ============================================================================
// PER-KIND
// ============================================================================

fn merge_namespace(dst: &mut NamespaceInfo, src: NamespaceInfo) {
    merge_base(&mut dst.base, src.base);
    union(&mut dst.members, src.members);
    union(&mut dst.specializations, src.specializations);
    dst.specs.merge(src.specs);
}

fn merge_record(dst: &mut RecordInfo, src: RecordInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.key_kind, src.key_kind);
    dst.is_typedef |= src.is_typedef;
    fill(&mut dst.bases, src.bases);
    fill_opt(&mut dst.template, src.template);
    union(&mut dst.members, src.members);
    union(&mut dst.specializations, src.specializations);
    dst.friends.extend(src.friends);
    dst.friends.sort_unstable();
    dst.friends.dedup();
    dst.specs.merge(src.specs);
}

fn merge_function(dst: &mut FunctionInfo, src: FunctionInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.params, src.params);
    fill(&mut dst.return_type, src.return_type);
    fill_opt(&mut dst.template, src.template);
    fill(&mut dst.class, src.class);
    fill(&mut dst.storage, src.storage);
    dst.specs.merge(src.specs);
}

fn merge_enum(dst: &mut EnumInfo, src: EnumInfo) {
    merge_base(&mut dst.base, src.base);
    dst.scoped |= src.scoped;
    fill_opt(&mut dst.underlying, src.underlying);
    union(&mut dst.members, src.members);
}

fn merge_enumerator(dst: &mut EnumeratorInfo, src: EnumeratorInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.initializer, src.initializer);
}

fn merge_field(dst: &mut FieldInfo, src: FieldInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.ty, src.ty);
    fill(&mut dst.default, src.default);
    fill(&mut dst.bitfield_width, src.bitfield_width);
    dst.specs.merge(src.specs);
}

fn merge_variable(dst: &mut VariableInfo, src: VariableInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.ty, src.ty);
    fill_opt(&mut dst.template, src.template);
    fill(&mut dst.storage, src.storage);
    dst.specs.merge(src.specs);
}

fn merge_typedef(dst: &mut TypedefInfo, src: TypedefInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.underlying, src.underlying);
    dst.is_using |= src.is_using;
    fill_opt(&mut dst.template, src.template);
}

fn merge_friend(dst: &mut FriendInfo, src: FriendInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.friend_symbol, src.friend_symbol);
    fill_opt(&mut dst.friend_type, src.friend_type);
}

fn merge_specialization(dst: &mut SpecializationInfo, src: SpecializationInfo) {
    merge_base(&mut dst.base, src.base);
    fill(&mut dst.primary, src.primary);
    fill(&mut dst.args, src.args);
    union(&mut dst.members, src.members);
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Merge `src` into `dst`.
///
/// Both must carry the same identity and kind; anything else means the
/// caller grouped records incorrectly.
///
/// `dst` comes out canonical (see [`Info::canonicalize`]). Merging a
/// record with itself is a no-op only if it was canonical to begin
/// with; a record assembled by pushing onto `friends` or `locs`
/// directly gets sorted.
pub fn merge(dst: &mut Info, src: Info) -> Result<(), MergeError> {
    if dst.id() != src.id() {
        return Err(MergeError::IdMismatch {
            left: dst.id(),
            right: src.id(),
        });
    }

    match (dst, src) {
        (Info::Namespace(d), Info::Namespace(s)) => merge_namespace(d, s),
        (Info::Record(d), Info::Record(s)) => merge_record(d, s),
        (Info::Function(d), Info::Function(s)) => merge_function(d, s),
        (Info::Enum(d), Info::Enum(s)) => merge_enum(d, s),
        (Info::Enumerator(d), Info::Enumerator(s)) => merge_enumerator(d, s),
        (Info::Field(d), Info::Field(s)) => merge_field(d, s),
        (Info::Variable(d), Info::Variable(s)) => merge_variable(d, s),
        (Info::Typedef(d), Info::Typedef(s)) => merge_typedef(d, s),
        (Info::Friend(d), Info::Friend(s)) => merge_friend(d, s),
        (Info::Specialization(d), Info::Specialization(s)) => merge_specialization(d, s),
        (d, s) => {
            return Err(MergeError::KindMismatch {
                id: d.id(),
                left: d.kind(),
                right: s.kind(),
            });
        }
    }
    Ok(())
}

/// Reduce every occurrence of one symbol into a single record.
pub fn reduce(infos: impl IntoIterator<Item = Info>) -> Result<Info, MergeError> {
    let mut iter = infos.into_iter();
    let mut merged = iter.next().ok_or(MergeError::Empty)?;
    for info in iter {
        merge(&mut merged, info)?;
    }
    merged.canonicalize();
    Ok(merged)
}

// ============================================================================
// CONFLICTS
// ============================================================================

/// Which structure two occurrences disagree on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    TemplateParams,
    TemplateArgs,
    Bases,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::TemplateParams => "template parameter list",
            ConflictKind::TemplateArgs => "template argument list",
            ConflictKind::Bases => "base class list",
        }
    }
}

/// Two occurrences of the same symbol describe different structure.
///
/// Merging still keeps the first one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub id: SymbolId,
    pub kind: ConflictKind,
}

impl Conflict {
    /// Convert into a warning diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(format!("redeclarations disagree on {}", self.kind.as_str()))
            .with_code(codes::STRUCTURAL_MISMATCH)
            .with_symbol(self.id)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: conflicting {}", self.id, self.kind.as_str())
    }
}

fn template_conflicts(
    id: SymbolId,
    a: Option<&TemplateInfo>,
    b: Option<&TemplateInfo>,
    out: &mut Vec<Conflict>,
) {
    let (Some(a), Some(b)) = (a, b) else {
        return;
    };
    if !a.params.is_empty() && !b.params.is_empty() && a.params != b.params {
        out.push(Conflict {
            id,
            kind: ConflictKind::TemplateParams,
        });
    }
    if !a.args.is_empty() && !b.args.is_empty() && a.args != b.args {
        out.push(Conflict {
            id,
            kind: ConflictKind::TemplateArgs,
        });
    }
}

/// Find structural disagreement between two occurrences of one symbol.
///
/// Only fields merged "whole collection, first non-empty" are compared,
/// and only when both sides are non-empty.
pub fn conflicts(a: &Info, b: &Info) -> Vec<Conflict> {
    let mut out = Vec::new();
    if a.id() != b.id() || a.kind() != b.kind() {
        return out;
    }
    template_conflicts(a.id(), a.template(), b.template(), &mut out);
    if let (Info::Record(a), Info::Record(b)) = (a, b) {
        if !a.bases.is_empty() && !b.bases.is_empty() && a.bases != b.bases {
            out.push(Conflict {
                id: a.base.id,
                kind: ConflictKind::Bases,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Location;
    use crate::hir::{BaseInfo, FunctionSpecs, InfoKind, TemplateParam, TypeInfo};

    fn sid(usr: &str) -> SymbolId {
        SymbolId::from_usr(usr).unwrap()
    }

    fn namespace(name: &str, members: &[&str]) -> Info {
        let mut ns = NamespaceInfo::new(sid("N"));
        ns.base.name = name.into();
        ns.members.extend(members.iter().map(|m| sid(m)));
        ns.into()
    }

    #[test]
    fn test_self_merge_canonicalizes() {
        let mut record = RecordInfo::new(sid("R"));
        record.friends = vec![sid("b"), sid("a"), sid("b")];
        record.base.source.locs = vec![Location::new("z.h", 2), Location::new("a.h", 9)];
        let raw = Info::from(record);

        let mut merged = raw.clone();
        merge(&mut merged, raw.clone()).unwrap();

        let mut canonical = raw;
        canonical.canonicalize();
        assert_eq!(merged, canonical);

        let mut again = merged.clone();
        merge(&mut again, merged.clone()).unwrap();
        assert_eq!(again, merged);
    }

    #[test]
    fn test_first_non_empty_name_and_member_union() {
        let merged = reduce([namespace("foo", &["F1"]), namespace("", &["F2"])]).unwrap();

        assert_eq!(merged.name(), "foo");
        let members = merged.members().unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains(&sid("F1")));
        assert!(members.contains(&sid("F2")));
    }

    #[test]
    fn test_reduce_empty() {
        assert_eq!(reduce(Vec::<Info>::new()), Err(MergeError::Empty));
    }

    #[test]
    fn test_merge_id_mismatch() {
        let mut a = Info::new(sid("a"), InfoKind::Field);
        let b = Info::new(sid("b"), InfoKind::Field);
        assert!(matches!(
            merge(&mut a, b),
            Err(MergeError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_merge_kind_mismatch() {
        let mut a = Info::new(sid("a"), InfoKind::Field);
        let b = Info::new(sid("a"), InfoKind::Variable);
        assert_eq!(
            merge(&mut a, b),
            Err(MergeError::KindMismatch {
                id: sid("a"),
                left: InfoKind::Field,
                right: InfoKind::Variable,
            })
        );
    }

    #[test]
    fn test_function_specs_or() {
        let mut a = FunctionInfo::new(sid("f"));
        a.specs.is_virtual = true;
        let mut b = FunctionInfo::new(sid("f"));
        b.specs.is_noexcept = true;

        let Info::Function(merged) = reduce([Info::from(a), Info::from(b)]).unwrap() else {
            unreachable!()
        };
        assert_eq!(
            merged.specs,
            FunctionSpecs {
                is_virtual: true,
                is_noexcept: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_locations_union_sorted() {
        let mut a = FunctionInfo::new(sid("f"));
        a.base.source.add_location(Location::new("b.h", 3));
        let mut b = FunctionInfo::new(sid("f"));
        b.base.source.add_location(Location::new("a.h", 10));
        b.base.source.add_location(Location::new("b.h", 3));
        b.base.source.set_definition(Location::new("f.cpp", 1));

        let merged = reduce([Info::from(a), Info::from(b)]).unwrap();
        let source = &merged.base().source;
        assert_eq!(source.locs, vec![Location::new("a.h", 10), Location::new("b.h", 3)]);
        assert_eq!(source.def_loc, Some(Location::new("f.cpp", 1)));
    }

    #[test]
    fn test_bases_first_non_empty_and_conflict() {
        let base = |name: &str| BaseInfo {
            ty: TypeInfo::new(sid(name), name),
            ..Default::default()
        };
        let a = RecordInfo::new(sid("r"));
        let mut b = RecordInfo::new(sid("r"));
        b.bases.push(base("B1"));
        let mut c = RecordInfo::new(sid("r"));
        c.bases.push(base("B2"));

        let (a, b, c) = (Info::from(a), Info::from(b), Info::from(c));
        assert!(conflicts(&a, &b).is_empty());
        assert_eq!(
            conflicts(&b, &c),
            vec![Conflict {
                id: sid("r"),
                kind: ConflictKind::Bases,
            }]
        );

        let Info::Record(merged) = reduce([a, b, c]).unwrap() else {
            unreachable!()
        };
        assert_eq!(merged.bases, vec![base("B1")]);
    }

    #[test]
    fn test_template_conflict() {
        let template = |name: &str| TemplateInfo {
            params: vec![TemplateParam {
                name: name.into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut a = FunctionInfo::new(sid("f"));
        a.template = Some(template("T"));
        let mut b = FunctionInfo::new(sid("f"));
        b.template = Some(template("U"));

        let found = conflicts(&Info::from(a), &Info::from(b));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ConflictKind::TemplateParams);
        assert_eq!(
            found[0].to_diagnostic().code.as_deref(),
            Some(codes::STRUCTURAL_MISMATCH)
        );
    }

    #[test]
    fn test_self_merge_is_noop() {
        let mut record = RecordInfo::new(sid("r"));
        record.base.name = "Widget".into();
        record.members.insert(sid("m"));
        record.friends = vec![sid("f")];
        record.base.javadoc = Some(Javadoc::new("A widget."));
        record.base.source.add_location(Location::new("w.h", 4));
        let info: Info = record.into();

        let mut merged = info.clone();
        merge(&mut merged, info.clone()).unwrap();
        assert_eq!(merged, info);
    }
}
