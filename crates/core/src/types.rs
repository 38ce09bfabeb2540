//! Core identity types
//!
//! This module defines how rows are addressed throughout the system:
//! - [`EntityKey`]: entity name plus primary key of one logical row
//! - [`Payload`]: the opaque field document stored alongside the version

use serde::{Deserialize, Serialize};

/// Field document carried by a row
///
/// The locking protocol never looks inside a payload; it only compares a
/// managed payload with its snapshot to decide whether a write is needed.
pub type Payload = serde_json::Value;

/// Identity of one logical row
///
/// An entity key names the mapped entity (the table) and the primary key of
/// the row within it. It is used in:
/// - Row store lookups and conditioned writes
/// - Session snapshot maps
/// - Conflict records surfaced to callers
///
/// Keys are ordered by entity name, then id, so that a flush visits rows in a
/// deterministic order.
///
/// # Examples
///
/// ```
/// use rowguard_core::EntityKey;
///
/// let key = EntityKey::new("Person", 7);
/// assert_eq!(key.entity(), "Person");
/// assert_eq!(key.id(), 7);
/// assert_eq!(key.to_string(), "Person#7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    entity: String,
    id: u64,
}

impl EntityKey {
    /// Create a new entity key
    pub fn new(entity: impl Into<String>, id: u64) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }

    /// Entity (table) name
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Primary key within the entity
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Display for EntityKey {
    /// Display key in the format: entity#id
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}
