//! Symbol records and the operations that combine them.
//!
//! ## Design Principles
//!
//! 1. **Identity is the key**: records refer to each other by [`SymbolId`],
//!    never by ownership, so any set of records can be merged with any other
//! 2. **Merging is pure**: [`merge`] and [`reduce`] take values and return
//!    values; locking lives in the execution layer
//! 3. **Forward references are explicit**: a reference to an identity
//!    nobody produced stays a pending slot, never a dangling handle
//!
//! ## Usage
//!
//! ```ignore
//! use symgraph::hir::{BatchBuilder, InfoKind};
//!
//! let mut builder = BatchBuilder::new();
//! let id = builder.identity("c:@N@foo", None).unwrap();
//! builder.get_or_create(id, InfoKind::Namespace)?.base_mut().name = "foo".into();
//! builder.emplace_child(SymbolId::GLOBAL, id, InfoKind::Namespace)?;
//! let batch = builder.finish();
//! ```
//!
//! [`SymbolId`]: crate::base::SymbolId

mod builder;
mod diagnostics;
mod info;
mod input;
mod merge;
mod resolve;
mod types;

pub use builder::BatchBuilder;
pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, codes};
pub(crate) use info::visit;
pub use info::{
    EnumInfo, EnumeratorInfo, FieldInfo, FriendInfo, FunctionInfo, Info, InfoBase, InfoKind,
    NamespaceInfo, RecordInfo, SpecializationInfo, TypedefInfo, VariableInfo,
};
pub use input::Batch;
pub use merge::{Conflict, ConflictKind, conflicts, merge, reduce};
pub use resolve::{Absorbed, Lookup, SlotId, UnresolvedSet};
pub use types::{
    AccessKind, BaseInfo, FieldSpecs, FunctionClass, FunctionSpecs, Javadoc, NamespaceSpecs, Param,
    RecordKeyKind, RecordSpecs, SpecializedMember, StorageClass, TemplateArg, TemplateInfo,
    TemplateParam, TemplateParamKind, TypeInfo, VariableSpecs,
};
