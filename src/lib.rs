//! # symgraph-base
//!
//! Core library for merging partial symbol graphs, one per translation
//! unit, into a single deduplicated corpus.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! corpus  → Final merged graph and link resolution for renderers
//!   ↓
//! exec    → Execution contexts (in-memory / bitcode), config, on-disk store
//!   ↓
//! bitcode → Wire format: bit-level stream, schema ids, writer, reader
//!   ↓
//! hir     → Symbol records, merge engine, forward references, batches
//!   ↓
//! base    → Primitives (SymbolId, Location)
//! ```
//!
//! `error` sits beside all of them and holds the error taxonomy.

/// Foundation types: SymbolId, Location
pub mod base;

/// Binary encoding of symbol records
pub mod bitcode;

/// The finished, read-only symbol graph
pub mod corpus;

/// Error types
pub mod error;

/// Execution contexts that combine batches
pub mod exec;

/// Symbol records and the operations that combine them
pub mod hir;

// Re-export the types most callers need
pub use base::{Location, SourceInfo, SymbolId};
pub use corpus::{Corpus, Link, SymbolLink};
pub use error::{ExecError, FormatError, IdentityError, MergeError};
pub use exec::{Config, ExecutionContext, Executor, Strategy};
pub use hir::{Batch, BatchBuilder, Info, InfoKind};
