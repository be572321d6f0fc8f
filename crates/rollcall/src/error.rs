//! Error types for rollcall.
//!
//! Every fallible operation in the crate returns [`Error`]. Callers decide
//! how to react by inspecting [`Error::kind`] rather than matching on
//! individual variants: the presentation layer shows the message verbatim,
//! and may retry only [`ErrorKind::Storage`] failures.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::MaterialStatus;

/// Named business rules carried by [`Error::BusinessRule`].
pub mod rules {
    /// The volunteer already has an open session.
    pub const ALREADY_CHECKED_IN: &str = "already checked in";
    /// The volunteer has no open session to close.
    pub const NOT_CHECKED_IN: &str = "not checked in";
    /// A check-in was attempted with an empty material list.
    pub const NO_MATERIALS_SELECTED: &str = "no materials selected";
    /// At least one requested material is missing or not available.
    pub const MATERIALS_UNAVAILABLE: &str = "materials unavailable";
    /// The disposition map does not match the session's materials.
    pub const INCOMPLETE_DISPOSITION: &str = "incomplete disposition";
    /// A disposition value is not one of the recognized values.
    pub const INVALID_DISPOSITION: &str = "invalid disposition";
    /// Another material already uses this name.
    pub const DUPLICATE_NAME: &str = "duplicate name";
    /// Another material already uses this code.
    pub const DUPLICATE_CODE: &str = "duplicate code";
    /// The material state machine forbids the requested move.
    pub const INVALID_TRANSITION: &str = "invalid transition";
    /// A material entered `loaned` without a borrower.
    pub const MISSING_LOAN_TARGET: &str = "missing loan target";
    /// A session lists a material that is loaned to someone else.
    pub const NOT_HELD_BY_VOLUNTEER: &str = "not held by volunteer";
    /// The material is still listed in its borrower's open session.
    pub const MATERIAL_IN_SESSION: &str = "material in open session";
}

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A registered volunteer.
    Volunteer,
    /// A loanable material.
    Material,
    /// A check-in or check-out record.
    Activity,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volunteer => write!(f, "volunteer"),
            Self::Material => write!(f, "material"),
            Self::Activity => write!(f, "activity"),
        }
    }
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// A domain precondition failed.
    BusinessRule,
    /// Malformed input, rejected before any transaction started.
    Validation,
    /// The persistence layer failed; no writes were applied.
    Storage,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// A bug in rollcall itself.
    Internal,
}

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// A referenced entity is absent.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Which collection was searched.
        entity: EntityKind,
        /// The identifier that was looked up.
        id: String,
    },

    /// A domain precondition failed.
    #[error("{message}")]
    BusinessRule {
        /// Stable rule name, one of the constants in [`rules`].
        rule: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// The material state machine does not allow this transition.
    #[error("status transition from '{from}' to '{to}' is not allowed")]
    InvalidTransition {
        /// Current status.
        from: MaterialStatus,
        /// Requested status.
        to: MaterialStatus,
    },

    /// A material was moved to `loaned` without a borrower.
    #[error("material {material_id} cannot be loaned without a volunteer")]
    MissingLoanTarget {
        /// The material being loaned.
        material_id: String,
    },

    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending input field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A storage operation failed.
    #[error("storage error during {operation}: {source}")]
    Storage {
        /// What the store was doing.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored document could not be decoded or encoded.
    #[error("corrupt record {id} in {collection}: {source}")]
    CorruptRecord {
        /// Collection table name.
        collection: &'static str,
        /// Record identifier.
        id: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a business rule error.
    #[must_use]
    pub fn business(rule: &'static str, message: impl Into<String>) -> Self {
        Self::BusinessRule {
            rule,
            message: message.into(),
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Wrap a `SQLite` failure with the operation that triggered it.
    #[must_use]
    pub fn storage(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage { operation, source }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BusinessRule { .. }
            | Self::InvalidTransition { .. }
            | Self::MissingLoanTarget { .. } => ErrorKind::BusinessRule,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::DatabaseOpen { .. }
            | Self::Storage { .. }
            | Self::DatabaseMigration { .. }
            | Self::CorruptRecord { .. }
            | Self::DirectoryCreate { .. } => ErrorKind::Storage,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The business rule name, if this error is a rule violation.
    #[must_use]
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::BusinessRule { rule, .. } => Some(rule),
            Self::InvalidTransition { .. } => Some(rules::INVALID_TRANSITION),
            Self::MissingLoanTarget { .. } => Some(rules::MISSING_LOAN_TARGET),
            _ => None,
        }
    }

    /// Check if this error reports a missing entity.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error is any business rule violation.
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        self.kind() == ErrorKind::BusinessRule
    }

    /// Check if this error is a violation of the named rule.
    #[must_use]
    pub fn is_rule(&self, rule: &str) -> bool {
        self.rule() == Some(rule)
    }
}

/// Attach an operation name to raw `SQLite` results.
pub(crate) trait StorageContext<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for std::result::Result<T, rusqlite::Error> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|source| Error::storage(operation, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(EntityKind::Volunteer, "v-1");
        assert_eq!(err.to_string(), "volunteer not found: v-1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_business_rule_display_is_message() {
        let err = Error::business(rules::ALREADY_CHECKED_IN, "Ana is already checked in");
        assert_eq!(err.to_string(), "Ana is already checked in");
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.is_rule(rules::ALREADY_CHECKED_IN));
    }

    #[test]
    fn test_invalid_transition_is_business_rule() {
        let err = Error::InvalidTransition {
            from: MaterialStatus::Maintenance,
            to: MaterialStatus::Lost,
        };
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.is_rule(rules::INVALID_TRANSITION));
        let msg = err.to_string();
        assert!(msg.contains("maintenance"));
        assert!(msg.contains("lost"));
    }

    #[test]
    fn test_missing_loan_target_kind() {
        let err = Error::MissingLoanTarget {
            material_id: "m-1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.to_string().contains("m-1"));
    }

    #[test]
    fn test_validation_display() {
        let err = Error::validation("name", "must have at least 2 characters");
        assert_eq!(
            err.to_string(),
            "invalid name: must have at least 2 characters"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.rule(), None);
    }

    #[test]
    fn test_storage_context() {
        let raw: std::result::Result<(), rusqlite::Error> =
            Err(rusqlite::Error::QueryReturnedNoRows);
        let err = raw.during("load volunteer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("load volunteer"));
    }

    #[test]
    fn test_database_open_error_display() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::DatabaseOpen {
                path: PathBuf::from("/nonexistent/path/db.sqlite"),
                source: sqlite_err,
            };
            assert!(err.to_string().contains("/nonexistent/path/db.sqlite"));
            assert_eq!(err.kind(), ErrorKind::Storage);
        }
    }

    #[test]
    fn test_corrupt_record_kind() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err = Error::CorruptRecord {
            collection: "materials",
            id: "m-9".to_string(),
            source: json_err,
        };
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("m-9"));
    }

    #[test]
    fn test_config_validation_kind() {
        let err = Error::ConfigValidation {
            message: "max_results must be greater than 0".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("max_results"));
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::Material.to_string(), "material");
        assert_eq!(EntityKind::Activity.to_string(), "activity");
    }
}
