//! Row version tokens
//!
//! A [`RowVersion`] is the in-memory form of a backend-maintained version
//! column such as SQL Server's `rowversion`. The backend assigns a new value
//! on every successful write to a row, including the insert; the application
//! only ever carries a token back into the condition of its next write.
//!
//! ## Equality only
//!
//! Tokens are opaque. They support equality and hashing and nothing else:
//! no ordering, no arithmetic, no `Default`, no integer conversions. Any
//! client-side "next version" computation is therefore unrepresentable.

use smallvec::SmallVec;

/// Inline capacity covers the 8-byte `rowversion` layout without allocating.
const INLINE_BYTES: usize = 8;

/// Opaque, backend-generated row version
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RowVersion {
    bytes: SmallVec<[u8; INLINE_BYTES]>,
}

impl RowVersion {
    /// Wrap bytes read from the backend's version column.
    ///
    /// Only codecs call this; the layout check happens there.
    pub(crate) fn from_backend(raw: &[u8]) -> Self {
        Self {
            bytes: SmallVec::from_slice(raw),
        }
    }

    /// Raw bytes exactly as the backend produced them
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the token
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length token (never produced by a well-formed codec)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Display for RowVersion {
    /// Hex rendering in the style of SQL Server: `0x00000000000007D1`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("0x")?;
        for byte in self.bytes.iter() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RowVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RowVersion({})", self)
    }
}
