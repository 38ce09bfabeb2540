//! Version token codecs
//!
//! A codec maps a backend's native version column to and from [`RowVersion`].
//! It validates layout on the way in and hands the exact bytes back for the
//! write condition on the way out. It never produces a new token: every token
//! a codec sees was generated by the backend.
//!
//! ## Layouts
//!
//! | Column type | Backend | Width |
//! |-------------|---------|-------|
//! | `dbbinary` / `rowversion` | SQL Server `rowversion` (`timestamp`) | 8 bytes |

use crate::error::{Error, Result};
use crate::token::RowVersion;

/// Translate a backend version column to and from tokens
pub trait VersionCodec: Send + Sync + std::fmt::Debug {
    /// Column type name this codec was built for
    fn column_type(&self) -> &'static str;

    /// Decode the raw column value read from the backend.
    ///
    /// Fails with [`Error::MalformedToken`] if the layout is not the one the
    /// backend produces for its generated version column.
    fn decode(&self, raw: &[u8]) -> Result<RowVersion>;

    /// Bytes to place in the condition of a write.
    fn encode<'a>(&self, token: &'a RowVersion) -> Result<&'a [u8]>;
}

/// Fixed-width binary version column
///
/// SQL Server's `rowversion` is an 8-byte binary value drawn from a
/// database-wide counter; this codec accepts exactly that width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryVersionCodec {
    column_type: &'static str,
    width: usize,
}

impl BinaryVersionCodec {
    /// SQL Server `rowversion` / `timestamp` column
    pub const ROWVERSION: BinaryVersionCodec = BinaryVersionCodec::new("dbbinary", 8);

    /// Codec for a fixed-width binary column
    pub const fn new(column_type: &'static str, width: usize) -> Self {
        Self { column_type, width }
    }

    /// Exact byte width accepted
    pub const fn width(&self) -> usize {
        self.width
    }

    fn check_width(&self, actual: usize) -> Result<()> {
        if actual != self.width {
            return Err(Error::MalformedToken {
                column_type: self.column_type,
                expected: self.width,
                actual,
            });
        }
        Ok(())
    }
}

impl VersionCodec for BinaryVersionCodec {
    fn column_type(&self) -> &'static str {
        self.column_type
    }

    fn decode(&self, raw: &[u8]) -> Result<RowVersion> {
        self.check_width(raw.len())?;
        Ok(RowVersion::from_backend(raw))
    }

    fn encode<'a>(&self, token: &'a RowVersion) -> Result<&'a [u8]> {
        self.check_width(token.len())?;
        Ok(token.as_bytes())
    }
}
