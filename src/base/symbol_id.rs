//! Content-addressed symbol identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::IdentityError;

/// Width of a [`SymbolId`] in bytes (160 bits).
pub const SYMBOL_ID_LEN: usize = 20;

/// A content-addressed identifier for a symbol.
///
/// Derived by hashing the canonical reference string (USR) the extractor
/// produces for a declaration, so every translation unit that sees the same
/// declaration computes the same `SymbolId` without coordinating.
///
/// Two values are reserved:
/// - [`SymbolId::INVALID`] (all zero) means "no symbol"
/// - [`SymbolId::GLOBAL`] (all `0xFF`) names the global namespace
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct SymbolId([u8; SYMBOL_ID_LEN]);

impl SymbolId {
    /// The empty identifier.
    pub const INVALID: SymbolId = SymbolId([0; SYMBOL_ID_LEN]);

    /// The identifier of the global namespace.
    pub const GLOBAL: SymbolId = SymbolId([0xFF; SYMBOL_ID_LEN]);

    /// Derive an identifier from a canonical reference string.
    pub fn from_usr(usr: &str) -> Result<Self, IdentityError> {
        if usr.is_empty() {
            return Err(IdentityError::EmptyUsr);
        }
        let mut bytes = [0u8; SYMBOL_ID_LEN];
        let mut hasher = blake3::Hasher::new();
        hasher.update(usr.as_bytes());
        hasher.finalize_xof().fill(&mut bytes);
        let id = Self(bytes);
        // Reserved values are never handed out for real symbols
        if id == Self::INVALID || id == Self::GLOBAL {
            return Err(IdentityError::Reserved);
        }
        Ok(id)
    }

    /// Rebuild an identifier from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let raw: [u8; SYMBOL_ID_LEN] = bytes
            .try_into()
            .map_err(|_| IdentityError::BadLength { len: bytes.len() })?;
        Ok(Self(raw))
    }

    /// Wrap raw bytes without hashing.
    #[inline]
    pub const fn from_raw(raw: [u8; SYMBOL_ID_LEN]) -> Self {
        Self(raw)
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; SYMBOL_ID_LEN] {
        &self.0
    }

    /// Whether this is anything other than [`SymbolId::INVALID`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Whether this is the global namespace.
    #[inline]
    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// The bytes are already a uniformly distributed digest, so the
// leading word is as good a hash as the whole array.
impl Hash for SymbolId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[..8]);
        state.write_u64(u64::from_le_bytes(word));
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            return write!(f, "SymbolId(<global>)");
        }
        write!(f, "SymbolId({})", self.to_hex())
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for SymbolId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| IdentityError::BadHex { text: s.into() })?;
        Self::from_bytes(&bytes)
    }
}

impl From<SymbolId> for [u8; SYMBOL_ID_LEN] {
    #[inline]
    fn from(id: SymbolId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_stable() {
        let a = SymbolId::from_usr("c:@N@foo@F@bar#").unwrap();
        let b = SymbolId::from_usr("c:@N@foo@F@bar#").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_symbol_id_distinct() {
        let a = SymbolId::from_usr("c:@N@foo").unwrap();
        let b = SymbolId::from_usr("c:@N@bar").unwrap();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(!a.is_global());
    }

    #[test]
    fn test_symbol_id_empty_usr() {
        assert_eq!(SymbolId::from_usr(""), Err(IdentityError::EmptyUsr));
    }

    #[test]
    fn test_symbol_id_reserved() {
        assert!(!SymbolId::INVALID.is_valid());
        assert!(SymbolId::GLOBAL.is_valid());
        assert!(SymbolId::GLOBAL.is_global());
        assert_eq!(SymbolId::default(), SymbolId::INVALID);
    }

    #[test]
    fn test_symbol_id_hex_roundtrip() {
        let id = SymbolId::from_usr("c:@S@Widget").unwrap();
        let text = id.to_string();
        assert_eq!(text.len(), 40);
        assert_eq!(text.parse::<SymbolId>().unwrap(), id);
    }

    #[test]
    fn test_symbol_id_bad_length() {
        assert_eq!(
            SymbolId::from_bytes(&[1, 2, 3]),
            Err(IdentityError::BadLength { len: 3 })
        );
    }

    #[test]
    fn test_symbol_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(SymbolId::from_usr("a").unwrap());
        set.insert(SymbolId::from_usr("b").unwrap());
        set.insert(SymbolId::from_usr("a").unwrap()); // duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_symbol_id_size() {
        assert_eq!(std::mem::size_of::<SymbolId>(), 20);
    }
}
