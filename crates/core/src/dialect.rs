//! Backend dialects and their locking capabilities
//!
//! Backends differ in how they report a failed version condition. Some return
//! an update count of zero; others abort the statement with a serialization
//! failure because their isolation level detected the concurrent write first.
//! The detector never checks a backend by name at the call site: it resolves a
//! [`DialectCapabilities`] once and branches on its flags.
//!
//! ## Known Dialects
//!
//! | Dialect | Version on insert | Conflict reporting | Serialization failure |
//! |---------|-------------------|--------------------|-----------------------|
//! | SqlServer | yes | affected rows | error 3960 |
//! | SqlServerSnapshot | yes | serialization failure | error 3960 |
//! | CockroachDb | no | serialization failure | state 40001 |
//! | Generic | no | affected rows | none |

use crate::error::BackendError;
use serde::{Deserialize, Serialize};

/// SQL Server: "Snapshot isolation transaction aborted due to update conflict"
pub const SQLSERVER_SNAPSHOT_CONFLICT: i32 = 3960;

/// ANSI SQL state for serialization failure
pub const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// Backend identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// SQL Server under READ COMMITTED
    SqlServer,
    /// SQL Server under SNAPSHOT isolation
    SqlServerSnapshot,
    /// CockroachDB (always SERIALIZABLE)
    CockroachDb,
    /// Any backend reporting conflicts only through update counts
    Generic,
}

impl Dialect {
    /// All dialects (for iteration)
    pub const ALL: [Dialect; 4] = [
        Dialect::SqlServer,
        Dialect::SqlServerSnapshot,
        Dialect::CockroachDb,
        Dialect::Generic,
    ];

    /// Short identifier (for configuration, logs)
    pub const fn id(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "sql_server",
            Dialect::SqlServerSnapshot => "sql_server_snapshot",
            Dialect::CockroachDb => "cockroach_db",
            Dialect::Generic => "generic",
        }
    }

    /// Parse from short identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.id() == id)
    }

    /// Locking capabilities of this backend
    pub const fn capabilities(&self) -> DialectCapabilities {
        match self {
            Dialect::SqlServer => DialectCapabilities {
                dialect: *self,
                generates_version_on_insert: true,
                conflict_reporting: ConflictReporting::AffectedRows,
                serialization_failure: Some(FailureSignature::VendorCode(
                    SQLSERVER_SNAPSHOT_CONFLICT,
                )),
            },
            Dialect::SqlServerSnapshot => DialectCapabilities {
                dialect: *self,
                generates_version_on_insert: true,
                conflict_reporting: ConflictReporting::SerializationFailure,
                serialization_failure: Some(FailureSignature::VendorCode(
                    SQLSERVER_SNAPSHOT_CONFLICT,
                )),
            },
            Dialect::CockroachDb => DialectCapabilities {
                dialect: *self,
                generates_version_on_insert: false,
                conflict_reporting: ConflictReporting::SerializationFailure,
                serialization_failure: Some(FailureSignature::SqlState(
                    SQLSTATE_SERIALIZATION_FAILURE,
                )),
            },
            Dialect::Generic => DialectCapabilities {
                dialect: *self,
                generates_version_on_insert: false,
                conflict_reporting: ConflictReporting::AffectedRows,
                serialization_failure: None,
            },
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// How a failed version condition surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictReporting {
    /// The statement succeeds and affects zero rows
    AffectedRows,
    /// The statement fails with the dialect's serialization failure
    SerializationFailure,
}

/// Identifies a backend's serialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSignature {
    /// Matched on the vendor error number
    VendorCode(i32),
    /// Matched on the SQL state
    SqlState(&'static str),
}

impl FailureSignature {
    /// Check whether a backend error carries this signature
    pub fn matches(&self, err: &BackendError) -> bool {
        match self {
            FailureSignature::VendorCode(code) => err.vendor_code == Some(*code),
            FailureSignature::SqlState(state) => err.sql_state.as_deref() == Some(*state),
        }
    }
}

/// Capability flags the detector branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectCapabilities {
    /// Backend these flags were resolved for
    pub dialect: Dialect,
    /// Insert statements hand back the generated version
    pub generates_version_on_insert: bool,
    /// How a failed condition is normally reported
    pub conflict_reporting: ConflictReporting,
    /// Signature of the backend's serialization failure, if it has one
    pub serialization_failure: Option<FailureSignature>,
}

impl DialectCapabilities {
    /// Check whether a backend error is this dialect's serialization failure
    pub fn is_serialization_failure(&self, err: &BackendError) -> bool {
        self.serialization_failure
            .map(|signature| signature.matches(err))
            .unwrap_or(false)
    }

    /// Build the error this backend raises when a version condition fails
    ///
    /// Only meaningful for dialects that report conflicts as serialization
    /// failures; row stores use it to emulate the backend faithfully.
    pub fn serialization_failure_error(&self, message: impl Into<String>) -> BackendError {
        let err = BackendError::new(message);
        match self.serialization_failure {
            Some(FailureSignature::VendorCode(code)) => err.with_vendor_code(code),
            Some(FailureSignature::SqlState(state)) => err.with_sql_state(state),
            None => err,
        }
    }
}
