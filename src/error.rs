//! Error types.
//!
//! Each failure class has its own enum so callers can tell a bad
//! declaration (`IdentityError`) from a corrupt stream (`FormatError`)
//! from a broken grouping step (`MergeError`). `ExecError` is what an
//! execution context returns from `finish`.

use std::path::PathBuf;

use thiserror::Error;

use crate::base::SymbolId;
use crate::hir::InfoKind;

/// A declaration could not be given an identity.
///
/// Non-fatal: the caller skips the declaration and reports a diagnostic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("canonical reference string is empty")]
    EmptyUsr,
    #[error("canonical reference hashed to a reserved identity")]
    Reserved,
    #[error("symbol id must be 20 bytes, got {len}")]
    BadLength { len: usize },
    #[error("invalid symbol id hex: {text}")]
    BadHex { text: String },
}

/// A bitcode stream is malformed.
///
/// Always surfaced from `decode`; a partially decoded stream is never returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("premature end of stream")]
    PrematureEnd,
    #[error("invalid bitcode signature")]
    BadSignature,
    #[error("block {block} declares {len} bytes but only {available} remain")]
    BlockOverrun { block: u8, len: usize, available: usize },
    #[error("truncated record {record} in block {block}")]
    TruncatedRecord { block: u8, record: u8 },
    #[error("unexpected entry tag {tag:#04x} in block {block}")]
    BadEntry { block: u8, tag: u8 },
    #[error("record {record} in block {block} appears before any metadata")]
    MissingMetadata { block: u8, record: u8 },
    #[error("record {record} in block {block} has no declared abbreviation")]
    UnknownAbbrev { block: u8, record: u8 },
    #[error("record {record} in block {block} does not match its expected encoding")]
    AbbrevMismatch { block: u8, record: u8 },
    #[error("abbreviation for record {record} declared before any block id")]
    OrphanAbbrev { record: u8 },
    #[error("unknown abbreviation op {op} in metadata")]
    BadAbbrevOp { op: u8 },
    #[error("invalid value {value} for record {record} in block {block}")]
    BadValue { block: u8, record: u8, value: u64 },
    #[error("record {record} in block {block} holds a malformed symbol id")]
    BadSymbolId { block: u8, record: u8 },
    #[error("record {record} in block {block} holds a non UTF-8 string")]
    BadString { block: u8, record: u8 },
    #[error("block {block} is missing its symbol id")]
    MissingId { block: u8 },
}

/// Two records could not be merged, or a child could not be attached.
///
/// Indicates a bug in whatever grouped the records or walked the
/// declarations, not bad input, but is still returned as a value so
/// other groups keep reducing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge {left:?} with {right:?}: identities differ")]
    IdMismatch { left: SymbolId, right: SymbolId },
    #[error("cannot merge {id:?}: kind {left} differs from {right}")]
    KindMismatch { id: SymbolId, left: InfoKind, right: InfoKind },
    #[error("no info values to merge")]
    Empty,
    #[error("cannot register {child:?} under {parent:?}: parent was never created")]
    MissingParent { parent: SymbolId, child: SymbolId },
}

/// What went wrong while reducing one identity group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GroupErrorKind {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// A failure scoped to a single identity group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("symbol {id}: {error}")]
pub struct GroupError {
    pub id: SymbolId,
    pub error: GroupErrorKind,
}

/// Errors returned by an execution context.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("reduction was cancelled")]
    Cancelled,
    #[error("{} symbol group(s) failed to reduce", errors.len())]
    Reduce { errors: Vec<GroupError> },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("bitcode store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bitcode store entry {path} is not a valid symbol directory")]
    BadStoreEntry { path: PathBuf },
}

impl ExecError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
