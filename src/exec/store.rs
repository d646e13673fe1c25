//! On-disk handoff of encoded occurrences.
//!
//! Layout under the store root:
//!
//! ```text
//! <symbol-hex>/<content-hash>.bc
//! ```
//!
//! File names are content addressed, so saving the same occurrence twice
//! or from two processes writes one file.

use std::fs;
use std::path::{Path, PathBuf};

use super::bitcode::BitcodeExecutionContext;
use crate::base::SymbolId;
use crate::error::ExecError;

const EXTENSION: &str = "bc";

/// A directory of encoded occurrences.
#[derive(Clone, Debug)]
pub struct BitcodeStore {
    root: PathBuf,
}

impl BitcodeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every occurrence held by `ctx`. Returns the number of new files.
    pub fn save(&self, ctx: &BitcodeExecutionContext) -> Result<usize, ExecError> {
        let mut written = 0;
        for (id, group) in ctx.snapshot() {
            let dir = self.root.join(id.to_hex());
            fs::create_dir_all(&dir).map_err(|e| ExecError::io(&dir, e))?;
            for occurrence in group {
                let path = dir.join(format!("{}.{EXTENSION}", occurrence.hash.to_hex()));
                if path.exists() {
                    continue;
                }
                fs::write(&path, &occurrence.bytes).map_err(|e| ExecError::io(&path, e))?;
                written += 1;
            }
        }
        tracing::debug!(root = %self.root.display(), written, "saved bitcode store");
        Ok(written)
    }

    /// File every stored occurrence into `ctx`. Returns the number that
    /// were not already present.
    ///
    /// Contents are not decoded here; a corrupt file fails its symbol's
    /// group when `ctx` is finished.
    pub fn load(&self, ctx: &BitcodeExecutionContext) -> Result<usize, ExecError> {
        let mut loaded = 0;
        for dir in sorted_entries(&self.root)? {
            if !dir.is_dir() {
                continue;
            }
            let id = symbol_dir(&dir)?;
            for path in sorted_entries(&dir)? {
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                let bytes = fs::read(&path).map_err(|e| ExecError::io(&path, e))?;
                if ctx.insert_encoded(id, bytes) {
                    loaded += 1;
                }
            }
        }
        tracing::debug!(root = %self.root.display(), loaded, "loaded bitcode store");
        Ok(loaded)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ExecError> {
    let entries = fs::read_dir(dir).map_err(|e| ExecError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| ExecError::io(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

fn symbol_dir(dir: &Path) -> Result<SymbolId, ExecError> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.parse::<SymbolId>().ok())
        .ok_or_else(|| ExecError::BadStoreEntry {
            path: dir.to_path_buf(),
        })
}
