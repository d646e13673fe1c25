//! Entity records: one struct per symbol kind, unified by [`Info`].
//!
//! Every record is keyed by exactly one [`SymbolId`] and carries an
//! [`InfoBase`] with the attributes all kinds share. Cross-references
//! between records are by identity, never by ownership.

use std::fmt;

use indexmap::IndexSet;
use smol_str::SmolStr;

use super::types::{
    AccessKind, BaseInfo, FieldSpecs, FunctionClass, FunctionSpecs, Javadoc, NamespaceSpecs,
    Param, RecordKeyKind, RecordSpecs, SpecializedMember, StorageClass, TemplateArg, TemplateInfo,
    TypeInfo, VariableSpecs,
};
use crate::base::{SourceInfo, SymbolId};

// ============================================================================
// KIND
// ============================================================================

/// The closed set of symbol kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InfoKind {
    Namespace,
    Record,
    Function,
    Enum,
    Enumerator,
    Field,
    Variable,
    Typedef,
    Friend,
    Specialization,
}

impl InfoKind {
    /// Every kind, in declaration order.
    pub const ALL: [InfoKind; 10] = [
        InfoKind::Namespace,
        InfoKind::Record,
        InfoKind::Function,
        InfoKind::Enum,
        InfoKind::Enumerator,
        InfoKind::Field,
        InfoKind::Variable,
        InfoKind::Typedef,
        InfoKind::Friend,
        InfoKind::Specialization,
    ];

    /// Lowercase display name.
    pub fn as_str(self) -> &'static str {
        match self {
            InfoKind::Namespace => "namespace",
            InfoKind::Record => "record",
            InfoKind::Function => "function",
            InfoKind::Enum => "enum",
            InfoKind::Enumerator => "enumerator",
            InfoKind::Field => "field",
            InfoKind::Variable => "variable",
            InfoKind::Typedef => "typedef",
            InfoKind::Friend => "friend",
            InfoKind::Specialization => "specialization",
        }
    }

    /// Whether entities of this kind keep a separate bucket for
    /// specialization children.
    pub fn has_specializations(self) -> bool {
        matches!(self, InfoKind::Namespace | InfoKind::Record)
    }

    /// Whether entities of this kind own a member set.
    pub fn has_members(self) -> bool {
        matches!(
            self,
            InfoKind::Namespace | InfoKind::Record | InfoKind::Enum
        )
    }
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// COMMON ATTRIBUTES
// ============================================================================

/// Attributes shared by every kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoBase {
    /// Primary key. Never changes after creation.
    pub id: SymbolId,
    /// Unqualified name. May be empty until a defining occurrence is seen.
    pub name: SmolStr,
    /// Enclosing scopes, innermost first.
    pub parents: Vec<SymbolId>,
    pub access: AccessKind,
    pub javadoc: Option<Javadoc>,
    pub source: SourceInfo,
}

impl InfoBase {
    pub fn new(id: SymbolId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

// ============================================================================
// PER-KIND RECORDS
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub base: InfoBase,
    pub members: IndexSet<SymbolId>,
    pub specializations: IndexSet<SymbolId>,
    pub specs: NamespaceSpecs,
}

/// A class, struct or union.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordInfo {
    pub base: InfoBase,
    pub key_kind: RecordKeyKind,
    /// Declared through `typedef struct { ... } name;`.
    pub is_typedef: bool,
    pub bases: Vec<BaseInfo>,
    pub template: Option<TemplateInfo>,
    pub members: IndexSet<SymbolId>,
    pub specializations: IndexSet<SymbolId>,
    /// Friend declarations, sorted and unique. Kept that way by
    /// [`Info::insert_child`] and restored by [`Info::canonicalize`].
    pub friends: Vec<SymbolId>,
    pub specs: RecordSpecs,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionInfo {
    pub base: InfoBase,
    pub params: Vec<Param>,
    pub return_type: TypeInfo,
    pub template: Option<TemplateInfo>,
    pub class: FunctionClass,
    pub storage: StorageClass,
    pub specs: FunctionSpecs,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumInfo {
    pub base: InfoBase,
    /// `enum class` / `enum struct`.
    pub scoped: bool,
    pub underlying: Option<TypeInfo>,
    /// Enumerators, in declaration order.
    pub members: IndexSet<SymbolId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumeratorInfo {
    pub base: InfoBase,
    /// Initializer expression as written.
    pub initializer: SmolStr,
}

/// A non-static data member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldInfo {
    pub base: InfoBase,
    pub ty: TypeInfo,
    /// Default member initializer as written.
    pub default: SmolStr,
    /// Bit-field width expression as written.
    pub bitfield_width: SmolStr,
    pub specs: FieldSpecs,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableInfo {
    pub base: InfoBase,
    pub ty: TypeInfo,
    pub template: Option<TemplateInfo>,
    pub storage: StorageClass,
    pub specs: VariableSpecs,
}

/// A `typedef` or alias declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypedefInfo {
    pub base: InfoBase,
    pub underlying: TypeInfo,
    /// Declared with `using` rather than `typedef`.
    pub is_using: bool,
    pub template: Option<TemplateInfo>,
}

/// A friend declaration.
///
/// Befriends either a symbol (`friend_symbol`) or a type that has no
/// extracted symbol (`friend_type`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FriendInfo {
    pub base: InfoBase,
    pub friend_symbol: SymbolId,
    pub friend_type: Option<TypeInfo>,
}

/// An explicit specialization of a class template's members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecializationInfo {
    pub base: InfoBase,
    pub primary: SymbolId,
    pub args: Vec<TemplateArg>,
    pub members: IndexSet<SpecializedMember>,
}

// ============================================================================
// INFO
// ============================================================================

/// A symbol record of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Info {
    Namespace(NamespaceInfo),
    Record(RecordInfo),
    Function(FunctionInfo),
    Enum(EnumInfo),
    Enumerator(EnumeratorInfo),
    Field(FieldInfo),
    Variable(VariableInfo),
    Typedef(TypedefInfo),
    Friend(FriendInfo),
    Specialization(SpecializationInfo),
}

/// Dispatch over every kind, binding the per-kind record to `$bind`.
///
/// ```ignore
/// let name = visit!(&info, i => &i.base.name);
/// ```
macro_rules! visit {
    ($info:expr, $bind:ident => $body:expr) => {
        match $info {
            $crate::hir::Info::Namespace($bind) => $body,
            $crate::hir::Info::Record($bind) => $body,
            $crate::hir::Info::Function($bind) => $body,
            $crate::hir::Info::Enum($bind) => $body,
            $crate::hir::Info::Enumerator($bind) => $body,
            $crate::hir::Info::Field($bind) => $body,
            $crate::hir::Info::Variable($bind) => $body,
            $crate::hir::Info::Typedef($bind) => $body,
            $crate::hir::Info::Friend($bind) => $body,
            $crate::hir::Info::Specialization($bind) => $body,
        }
    };
}
pub(crate) use visit;

macro_rules! impl_from {
    ($($variant:ident($ty:ident)),+ $(,)?) => {
        $(
            impl $ty {
                pub fn new(id: SymbolId) -> Self {
                    Self {
                        base: InfoBase::new(id),
                        ..Default::default()
                    }
                }
            }

            impl From<$ty> for Info {
                fn from(info: $ty) -> Self {
                    Info::$variant(info)
                }
            }
        )+
    };
}

impl_from! {
    Namespace(NamespaceInfo),
    Record(RecordInfo),
    Function(FunctionInfo),
    Enum(EnumInfo),
    Enumerator(EnumeratorInfo),
    Field(FieldInfo),
    Variable(VariableInfo),
    Typedef(TypedefInfo),
    Friend(FriendInfo),
    Specialization(SpecializationInfo),
}

impl Info {
    /// Create an empty record of the given kind.
    pub fn new(id: SymbolId, kind: InfoKind) -> Self {
        match kind {
            InfoKind::Namespace => NamespaceInfo::new(id).into(),
            InfoKind::Record => RecordInfo::new(id).into(),
            InfoKind::Function => FunctionInfo::new(id).into(),
            InfoKind::Enum => EnumInfo::new(id).into(),
            InfoKind::Enumerator => EnumeratorInfo::new(id).into(),
            InfoKind::Field => FieldInfo::new(id).into(),
            InfoKind::Variable => VariableInfo::new(id).into(),
            InfoKind::Typedef => TypedefInfo::new(id).into(),
            InfoKind::Friend => FriendInfo::new(id).into(),
            InfoKind::Specialization => SpecializationInfo::new(id).into(),
        }
    }

    pub fn kind(&self) -> InfoKind {
        match self {
            Info::Namespace(_) => InfoKind::Namespace,
            Info::Record(_) => InfoKind::Record,
            Info::Function(_) => InfoKind::Function,
            Info::Enum(_) => InfoKind::Enum,
            Info::Enumerator(_) => InfoKind::Enumerator,
            Info::Field(_) => InfoKind::Field,
            Info::Variable(_) => InfoKind::Variable,
            Info::Typedef(_) => InfoKind::Typedef,
            Info::Friend(_) => InfoKind::Friend,
            Info::Specialization(_) => InfoKind::Specialization,
        }
    }

    #[inline]
    pub fn base(&self) -> &InfoBase {
        visit!(self, i => &i.base)
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut InfoBase {
        visit!(self, i => &mut i.base)
    }

    #[inline]
    pub fn id(&self) -> SymbolId {
        self.base().id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Template information, for the kinds that can be templated.
    pub fn template(&self) -> Option<&TemplateInfo> {
        match self {
            Info::Record(i) => i.template.as_ref(),
            Info::Function(i) => i.template.as_ref(),
            Info::Variable(i) => i.template.as_ref(),
            Info::Typedef(i) => i.template.as_ref(),
            _ => None,
        }
    }

    /// Whether this record describes a specialization of some template.
    pub fn is_specialization(&self) -> bool {
        match self {
            Info::Specialization(_) => true,
            _ => self.template().is_some_and(TemplateInfo::is_specialization),
        }
    }

    /// The ordinary member set, for kinds that have one.
    pub fn members(&self) -> Option<&IndexSet<SymbolId>> {
        match self {
            Info::Namespace(i) => Some(&i.members),
            Info::Record(i) => Some(&i.members),
            Info::Enum(i) => Some(&i.members),
            _ => None,
        }
    }

    /// The specialization bucket, for kinds that have one.
    pub fn specializations(&self) -> Option<&IndexSet<SymbolId>> {
        match self {
            Info::Namespace(i) => Some(&i.specializations),
            Info::Record(i) => Some(&i.specializations),
            _ => None,
        }
    }

    /// Register a child by identity.
    ///
    /// Friends of a record go to its friend list, specializations go to
    /// the specialization bucket when this kind has one, everything else
    /// to the member set. Returns `false` if the child was already present
    /// or this kind cannot own children.
    pub fn insert_child(&mut self, child: SymbolId, kind: InfoKind, is_specialization: bool) -> bool {
        match self {
            Info::Record(record) if kind == InfoKind::Friend => {
                match record.friends.binary_search(&child) {
                    Ok(_) => false,
                    Err(pos) => {
                        record.friends.insert(pos, child);
                        true
                    }
                }
            }
            Info::Namespace(ns) if is_specialization => ns.specializations.insert(child),
            Info::Record(record) if is_specialization => record.specializations.insert(child),
            Info::Namespace(ns) => ns.members.insert(child),
            Info::Record(record) => record.members.insert(child),
            Info::Enum(e) => e.members.insert(child),
            _ => false,
        }
    }

    /// Every identity this record refers to, without duplicates.
    ///
    /// Invalid identities are skipped.
    pub fn references(&self) -> Vec<SymbolId> {
        let mut refs: IndexSet<SymbolId> = IndexSet::new();
        refs.extend(self.base().parents.iter().copied());

        fn push_template(refs: &mut IndexSet<SymbolId>, template: &Option<TemplateInfo>) {
            if let Some(t) = template {
                refs.insert(t.primary);
            }
        }

        match self {
            Info::Namespace(i) => {
                refs.extend(i.members.iter().copied());
                refs.extend(i.specializations.iter().copied());
            }
            Info::Record(i) => {
                refs.extend(i.bases.iter().map(|b| b.ty.id));
                push_template(&mut refs, &i.template);
                refs.extend(i.members.iter().copied());
                refs.extend(i.specializations.iter().copied());
                refs.extend(i.friends.iter().copied());
            }
            Info::Function(i) => {
                refs.insert(i.return_type.id);
                refs.extend(i.params.iter().map(|p| p.ty.id));
                push_template(&mut refs, &i.template);
            }
            Info::Enum(i) => {
                if let Some(ty) = &i.underlying {
                    refs.insert(ty.id);
                }
                refs.extend(i.members.iter().copied());
            }
            Info::Enumerator(_) => {}
            Info::Field(i) => {
                refs.insert(i.ty.id);
            }
            Info::Variable(i) => {
                refs.insert(i.ty.id);
                push_template(&mut refs, &i.template);
            }
            Info::Typedef(i) => {
                refs.insert(i.underlying.id);
                push_template(&mut refs, &i.template);
            }
            Info::Friend(i) => {
                refs.insert(i.friend_symbol);
                if let Some(ty) = &i.friend_type {
                    refs.insert(ty.id);
                }
            }
            Info::Specialization(i) => {
                refs.insert(i.primary);
                for m in &i.members {
                    refs.insert(m.primary);
                    refs.insert(m.specialized);
                }
            }
        }

        let own = self.id();
        refs.into_iter()
            .filter(|id| id.is_valid() && *id != own)
            .collect()
    }

    /// Put derived collections into canonical order.
    pub fn canonicalize(&mut self) {
        self.base_mut().source.canonicalize();
        if let Info::Record(record) = self {
            record.friends.sort_unstable();
            record.friends.dedup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(usr: &str) -> SymbolId {
        SymbolId::from_usr(usr).unwrap()
    }

    #[test]
    fn test_new_matches_kind() {
        for kind in InfoKind::ALL {
            let info = Info::new(sid("x"), kind);
            assert_eq!(info.kind(), kind);
            assert_eq!(info.id(), sid("x"));
            assert!(info.name().is_empty());
        }
    }

    #[test]
    fn test_insert_child_idempotent() {
        let mut ns = Info::new(sid("ns"), InfoKind::Namespace);
        assert!(ns.insert_child(sid("f"), InfoKind::Function, false));
        assert!(!ns.insert_child(sid("f"), InfoKind::Function, false));
        assert_eq!(ns.members().map(IndexSet::len), Some(1));
    }

    #[test]
    fn test_insert_child_routes_specializations() {
        let mut record = Info::new(sid("r"), InfoKind::Record);
        record.insert_child(sid("spec"), InfoKind::Record, true);
        record.insert_child(sid("m"), InfoKind::Field, false);

        assert_eq!(record.members().map(IndexSet::len), Some(1));
        assert!(record.specializations().is_some_and(|s| s.contains(&sid("spec"))));
    }

    #[test]
    fn test_insert_child_friends_sorted() {
        let mut record = Info::new(sid("r"), InfoKind::Record);
        let mut ids = vec![sid("f1"), sid("f2"), sid("f3")];
        for id in &ids {
            record.insert_child(*id, InfoKind::Friend, false);
        }
        record.insert_child(ids[0], InfoKind::Friend, false);
        ids.sort();

        let Info::Record(record) = record else { unreachable!() };
        assert_eq!(record.friends, ids);
    }

    #[test]
    fn test_insert_child_rejected_by_leaf_kinds() {
        let mut field = Info::new(sid("f"), InfoKind::Field);
        assert!(!field.insert_child(sid("x"), InfoKind::Field, false));
    }

    #[test]
    fn test_is_specialization() {
        let mut record = RecordInfo::new(sid("r"));
        assert!(!Info::from(record.clone()).is_specialization());

        record.template = Some(TemplateInfo {
            primary: sid("primary"),
            ..Default::default()
        });
        assert!(Info::from(record).is_specialization());
        assert!(Info::new(sid("s"), InfoKind::Specialization).is_specialization());
    }

    #[test]
    fn test_references() {
        let mut func = FunctionInfo::new(sid("f"));
        func.base.parents.push(sid("ns"));
        func.return_type = TypeInfo::new(sid("ret"), "Ret");
        func.params.push(Param {
            name: "a".into(),
            ty: TypeInfo::builtin("int"),
            default: SmolStr::default(),
        });
        func.params.push(Param {
            name: "b".into(),
            ty: TypeInfo::new(sid("ret"), "Ret"),
            default: SmolStr::default(),
        });

        let refs = Info::from(func).references();
        assert_eq!(refs, vec![sid("ns"), sid("ret")]);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(InfoKind::Specialization.to_string(), "specialization");
        assert!(InfoKind::Record.has_specializations());
        assert!(!InfoKind::Enum.has_specializations());
    }
}
