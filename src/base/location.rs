//! Source locations attached to symbols.

use std::cmp::Ordering;
use std::fmt;

use smol_str::SmolStr;

/// A position in a source file where a symbol is declared or defined.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct Location {
    /// Path of the file, as normalized by the extractor.
    pub filename: SmolStr,
    /// 1-indexed line number.
    pub line: u32,
    /// Whether the file lives under the configured source root.
    pub is_file_in_root: bool,
}

impl Location {
    /// Create a new location.
    pub fn new(filename: impl Into<SmolStr>, line: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            is_file_in_root: true,
        }
    }

    /// Mark the file as living outside the source root.
    pub fn outside_root(mut self) -> Self {
        self.is_file_in_root = false;
        self
    }

    /// The identity of a location for deduplication: file and line.
    #[inline]
    pub fn key(&self) -> (&str, u32) {
        (&self.filename, self.line)
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

/// Where a symbol was seen.
///
/// `locs` holds declarations and is kept sorted by (file, line) with
/// duplicates removed, so merged output is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// The definition, if one was seen.
    pub def_loc: Option<Location>,
    /// Declarations other than the definition. Expected canonical; use
    /// [`SourceInfo::add_location`] or call [`SourceInfo::canonicalize`]
    /// after editing directly.
    pub locs: Vec<Location>,
}

impl SourceInfo {
    /// Create an empty source info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the definition location if none is known yet.
    pub fn set_definition(&mut self, loc: Location) {
        if self.def_loc.is_none() {
            self.def_loc = Some(loc);
        }
    }

    /// Insert a declaration location, keeping `locs` sorted and unique.
    pub fn add_location(&mut self, loc: Location) {
        match self.locs.binary_search_by(|probe| probe.cmp_key(&loc)) {
            Ok(_) => {}
            Err(pos) => self.locs.insert(pos, loc),
        }
    }

    /// Merge another source info into this one.
    ///
    /// The first definition wins; declarations are unioned, sorted and
    /// deduplicated by (file, line).
    pub fn merge(&mut self, other: SourceInfo) {
        if self.def_loc.is_none() {
            self.def_loc = other.def_loc;
        }
        self.locs.extend(other.locs);
        self.canonicalize();
    }

    /// Sort and deduplicate `locs`.
    pub fn canonicalize(&mut self) {
        self.locs.sort_by(Location::cmp_key);
        self.locs.dedup_by(|a, b| a.key() == b.key());
    }

    /// Whether no location at all is known.
    pub fn is_empty(&self) -> bool {
        self.def_loc.is_none() && self.locs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new("include/a.h", 10);
        assert_eq!(format!("{}", loc), "include/a.h:10");
    }

    #[test]
    fn test_add_location_dedups() {
        let mut source = SourceInfo::new();
        source.add_location(Location::new("a.h", 10));
        source.add_location(Location::new("a.h", 10));
        source.add_location(Location::new("a.h", 10).outside_root());

        assert_eq!(source.locs.len(), 1);
    }

    #[test]
    fn test_add_location_sorted() {
        let mut source = SourceInfo::new();
        source.add_location(Location::new("b.h", 1));
        source.add_location(Location::new("a.h", 20));
        source.add_location(Location::new("a.h", 3));

        let keys: Vec<_> = source.locs.iter().map(|l| l.key()).collect();
        assert_eq!(keys, vec![("a.h", 3), ("a.h", 20), ("b.h", 1)]);
    }

    #[test]
    fn test_merge_first_definition_wins() {
        let mut a = SourceInfo::new();
        a.set_definition(Location::new("a.cpp", 5));
        a.add_location(Location::new("a.h", 1));

        let mut b = SourceInfo::new();
        b.set_definition(Location::new("b.cpp", 7));
        b.add_location(Location::new("a.h", 1));
        b.add_location(Location::new("a.h", 2));

        a.merge(b);

        assert_eq!(a.def_loc, Some(Location::new("a.cpp", 5)));
        assert_eq!(a.locs.len(), 2);
    }
}
