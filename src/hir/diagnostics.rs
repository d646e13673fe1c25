//! Diagnostics: problems found while extracting or merging symbols.
//!
//! Producers attach diagnostics to each batch; the execution context
//! merges them into one [`DiagnosticCollector`], adding its own for
//! failed merges, malformed streams and unresolved references.

use std::fmt;
use std::sync::Arc;

use crate::base::{Location, SymbolId};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Lower is more severe.
    fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
            Severity::Hint => 3,
        }
    }

    /// Whether this is at least as severe as `min`.
    pub fn at_least(self, min: Severity) -> bool {
        self.rank() <= min.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

/// A diagnostic message, optionally tied to a symbol and a location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    /// The diagnostic message.
    pub message: Arc<str>,
    /// The symbol this is about, if any.
    pub symbol: Option<SymbolId>,
    /// Where in the source, if known.
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a diagnostic with the given severity.
    pub fn new(severity: Severity, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            symbol: None,
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the symbol this diagnostic is about.
    pub fn with_symbol(mut self, id: SymbolId) -> Self {
        self.symbol = Some(id);
        self
    }

    /// Attach a source location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Emit through `tracing` at the matching level.
    pub fn log(&self) {
        let code = self.code.as_deref().unwrap_or("");
        let symbol = self.symbol.map(|id| id.to_string()).unwrap_or_default();
        let location = self
            .location
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match self.severity {
            Severity::Error => {
                tracing::error!(code, symbol = %symbol, location = %location, "{}", self.message)
            }
            Severity::Warning => {
                tracing::warn!(code, symbol = %symbol, location = %location, "{}", self.message)
            }
            Severity::Info => {
                tracing::info!(code, symbol = %symbol, location = %location, "{}", self.message)
            }
            Severity::Hint => {
                tracing::debug!(code, symbol = %symbol, location = %location, "{}", self.message)
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.severity.as_str())?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes.
pub mod codes {
    /// Occurrences of one symbol could not be merged.
    pub const MERGE_FAILED: &str = "E0001";
    /// A bitcode stream could not be decoded.
    pub const MALFORMED_BITCODE: &str = "E0002";

    /// A referenced symbol was never extracted.
    pub const UNRESOLVED_REFERENCE: &str = "W0001";
    /// A declaration had no usable canonical reference and was skipped.
    pub const IDENTITY_UNAVAILABLE: &str = "W0002";
    /// Redeclarations disagree on template or base structure.
    pub const STRUCTURAL_MISMATCH: &str = "W0003";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics from every batch.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add diagnostics produced elsewhere, logging each one as it arrives.
    pub fn merge_and_report(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            diagnostic.log();
            self.diagnostics.push(diagnostic);
        }
    }

    /// Log a one-line summary of everything at or above `min`.
    pub fn report_totals(&self, min: Severity) {
        let errors = self.error_count();
        let warnings = self.warning_count();
        let shown = self
            .diagnostics
            .iter()
            .filter(|d| d.severity.at_least(min))
            .count();
        if shown == 0 {
            return;
        }
        if errors > 0 {
            tracing::error!(errors, warnings, "diagnostics reported");
        } else if warnings > 0 && Severity::Warning.at_least(min) {
            tracing::warn!(warnings, "diagnostics reported");
        } else {
            tracing::info!(total = shown, "diagnostics reported");
        }
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get diagnostics about a specific symbol.
    pub fn diagnostics_for_symbol(&self, id: SymbolId) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.symbol == Some(id))
            .collect()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Consume the collector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
