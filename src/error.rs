//! Error types for objgrep.
//!
//! Error codes are organized by category:
//!
//! - **OBJ-E001 to OBJ-E009**: Snapshot loading errors
//! - **OBJ-E010 to OBJ-E099**: Query configuration errors (reported before traversal)
//! - **OBJ-E900 to OBJ-E999**: Internal and miscellaneous errors
//!
//! Failures raised by the inspected graph itself (throwing getters, throwing
//! predicates) are [`HostError`](crate::host::HostError)s and never become an
//! [`ObjgrepError`]: the traversal absorbs them per property.

use thiserror::Error;

/// Main error type for objgrep operations.
#[derive(Error, Debug)]
pub enum ObjgrepError {
    /// Snapshot file not found at the specified path.
    #[error("Snapshot not found: {path}")]
    SnapshotNotFound { path: String },

    /// Snapshot document is structurally invalid.
    #[error("Invalid snapshot: {reason}")]
    Snapshot { reason: String },

    /// Invalid query provided.
    #[error("Invalid query: {query}")]
    InvalidQuery { query: String },

    /// No non-empty query field was provided.
    #[error("Query cannot be empty")]
    EmptyQuery,

    /// Search kind is not one of by-kind, by-name, by-value, custom.
    #[error("Invalid search request - unknown search type '{kind}'")]
    UnknownSearchKind { kind: String },

    /// The query argument's kind is not accepted by the selected filter.
    #[error("`{argument}` must be a {expected}")]
    QueryKindMismatch { argument: String, expected: String },

    /// Pattern could not be compiled.
    #[error("Regex rejected: {reason}")]
    RegexRejected { reason: String },

    /// Loose by-value matching was requested for a structured value.
    #[error("Loose value matching is not defined for {kind} queries")]
    UnsupportedLooseQuery { kind: String },

    /// Filter name is not registered.
    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    /// Root override path does not resolve to an object.
    #[error("Root not found: {path}")]
    RootNotFound { path: String },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error occurred.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ObjgrepError {
    /// Returns the error code for this error.
    pub const fn error_code(&self) -> &'static str {
        match self {
            ObjgrepError::SnapshotNotFound { .. } => "OBJ-E001",
            ObjgrepError::Snapshot { .. } => "OBJ-E002",
            ObjgrepError::InvalidQuery { .. } => "OBJ-E011",
            ObjgrepError::EmptyQuery => "OBJ-E012",
            ObjgrepError::UnknownSearchKind { .. } => "OBJ-E013",
            ObjgrepError::QueryKindMismatch { .. } => "OBJ-E014",
            ObjgrepError::RegexRejected { .. } => "OBJ-E015",
            ObjgrepError::UnsupportedLooseQuery { .. } => "OBJ-E016",
            ObjgrepError::UnknownFilter { .. } => "OBJ-E017",
            ObjgrepError::RootNotFound { .. } => "OBJ-E018",
            ObjgrepError::IoError(_) => "OBJ-E901",
            ObjgrepError::JsonError(_) => "OBJ-E902",
        }
    }

    /// Returns the severity level for this error.
    pub const fn severity(&self) -> &'static str {
        match self {
            ObjgrepError::EmptyQuery => "warning",
            _ => "error",
        }
    }

    /// True for errors raised while validating a query, before any traversal.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ObjgrepError::InvalidQuery { .. }
                | ObjgrepError::EmptyQuery
                | ObjgrepError::UnknownSearchKind { .. }
                | ObjgrepError::QueryKindMismatch { .. }
                | ObjgrepError::RegexRejected { .. }
                | ObjgrepError::UnsupportedLooseQuery { .. }
                | ObjgrepError::UnknownFilter { .. }
                | ObjgrepError::RootNotFound { .. }
        )
    }

    /// Returns remediation hints for this error, if available.
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            ObjgrepError::SnapshotNotFound { .. } => {
                Some("Ensure the snapshot path is correct and the file exists.")
            }
            ObjgrepError::Snapshot { .. } => {
                Some("Check that every \"$ref\" names an entry under \"objects\".")
            }
            ObjgrepError::InvalidQuery { .. } => {
                Some("Check that your query is properly formatted and valid.")
            }
            ObjgrepError::EmptyQuery => {
                Some("Provide one of --by-name, --by-value or --by-kind.")
            }
            ObjgrepError::UnknownSearchKind { .. } => {
                Some("Valid search kinds: by-kind, by-name, by-value, custom")
            }
            ObjgrepError::QueryKindMismatch { .. } => None,
            ObjgrepError::RegexRejected { .. } => {
                Some("Non-strict queries are regular expressions; escape special characters or use --strict.")
            }
            ObjgrepError::UnsupportedLooseQuery { .. } => {
                Some("Use --strict to compare structured values by identity.")
            }
            ObjgrepError::UnknownFilter { .. } => {
                Some("Register the filter before searching, or pass a predicate directly.")
            }
            ObjgrepError::RootNotFound { .. } => {
                Some("The root path must name an object reachable from the global object.")
            }
            ObjgrepError::IoError(_) => Some("Check file permissions."),
            ObjgrepError::JsonError(_) => None,
        }
    }
}
