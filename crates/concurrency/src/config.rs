//! Locking configuration
//!
//! ```toml
//! version_column_type = "dbbinary"
//! unify_not_found = false
//! ignore_delete_of_missing = false
//! ```

use rowguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session factory configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockingConfig {
    /// Column type name used to look up the version codec
    pub version_column_type: String,
    /// Report a vanished row as a conflict instead of `RowNotFound`
    pub unify_not_found: bool,
    /// Treat deleting an already-deleted row as success
    pub ignore_delete_of_missing: bool,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            version_column_type: "dbbinary".to_string(),
            unify_not_found: false,
            ignore_delete_of_missing: false,
        }
    }
}

impl LockingConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Use a different version column type
    pub fn with_version_column_type(mut self, column_type: impl Into<String>) -> Self {
        self.version_column_type = column_type.into();
        self
    }

    /// Report vanished rows as conflicts
    pub fn with_unified_not_found(mut self, unify: bool) -> Self {
        self.unify_not_found = unify;
        self
    }

    /// Let deletes of already-deleted rows succeed
    pub fn with_ignore_delete_of_missing(mut self, ignore: bool) -> Self {
        self.ignore_delete_of_missing = ignore;
        self
    }
}
