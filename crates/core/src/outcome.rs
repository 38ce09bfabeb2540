//! Outcome of a conditioned write

/// Result of a write conditioned on a version token
///
/// - `Applied(T)`: the condition held; `T` is the new token for updates and
///   `()` for deletes
/// - `Conflict`: the row exists but its token no longer matches
/// - `NotFound`: the row is gone
///
/// Callers that make no behavioural difference between the last two can use
/// [`Outcome::is_stale`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// Write applied
    Applied(T),
    /// Row was concurrently modified
    Conflict,
    /// Row no longer exists
    NotFound,
}

impl<T> Outcome<T> {
    /// Check if the write applied
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// Check if the write was rejected as a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Outcome::Conflict)
    }

    /// Check if the row was gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    /// Conflict or not-found: the snapshot was stale either way
    pub fn is_stale(&self) -> bool {
        !self.is_applied()
    }

    /// Value of an applied write
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    /// Name for logs
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied(_) => "applied",
            Outcome::Conflict => "conflict",
            Outcome::NotFound => "not_found",
        }
    }
}
