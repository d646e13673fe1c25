//! Foundation types for the symgraph toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`SymbolId`] - Content-addressed symbol identifiers
//! - [`Location`], [`SourceInfo`] - Source positions of declarations
//!
//! This module has NO dependencies on other symgraph modules except `error`.

mod location;
mod symbol_id;

pub use location::{Location, SourceInfo};
pub use symbol_id::{SYMBOL_ID_LEN, SymbolId};
