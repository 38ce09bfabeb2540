//! Column type registry
//!
//! Generic mapping code locates a version codec by the SQL column type name
//! declared on the mapping (`"dbbinary"`, `"rowversion"`) without knowing
//! which backend produced the column. Names are matched case-insensitively.

use crate::codec::{BinaryVersionCodec, VersionCodec};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Arc;

static DEFAULT_REGISTRY: Lazy<ColumnTypeRegistry> = Lazy::new(ColumnTypeRegistry::with_defaults);

/// Codecs keyed by column type name
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeRegistry {
    codecs: FxHashMap<String, Arc<dyn VersionCodec>>,
}

impl ColumnTypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in row version codecs
    ///
    /// `dbbinary` and `rowversion` both resolve to the 8-byte SQL Server
    /// `rowversion` codec.
    pub fn with_defaults() -> Self {
        let rowversion: Arc<dyn VersionCodec> = Arc::new(BinaryVersionCodec::ROWVERSION);
        let mut registry = Self::new();
        registry.register(Arc::clone(&rowversion));
        registry.codecs.insert(normalize("rowversion"), rowversion);
        registry
    }

    /// Process-wide registry holding the built-in codecs
    pub fn global() -> &'static ColumnTypeRegistry {
        &DEFAULT_REGISTRY
    }

    /// Register a codec under its own column type name
    ///
    /// Replaces any codec previously registered under that name.
    pub fn register(&mut self, codec: Arc<dyn VersionCodec>) {
        let name = normalize(codec.column_type());
        self.codecs.insert(name, codec);
    }

    /// Make `alias` resolve to the codec registered as `target`
    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        let codec = self.resolve(target)?;
        self.codecs.insert(normalize(alias), codec);
        Ok(())
    }

    /// Look up the codec for a column type name
    pub fn resolve(&self, column_type: &str) -> Result<Arc<dyn VersionCodec>> {
        self.codecs
            .get(&normalize(column_type))
            .cloned()
            .ok_or_else(|| Error::UnknownColumnType(column_type.to_string()))
    }

    /// Check whether a name is registered
    pub fn contains(&self, column_type: &str) -> bool {
        self.codecs.contains_key(&normalize(column_type))
    }

    /// Number of registered names (aliases included)
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
