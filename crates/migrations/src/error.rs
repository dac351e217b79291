use schemigrate_schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

use crate::definitions::{MigrationDirection, Version};

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors raised while discovering, applying or reverting migrations
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A mutation's read or save against the schema failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The applied-versions log could not be read or written
    #[error("applied-migrations log unavailable: {0}")]
    Log(#[source] SchemaError),

    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration file or definition is malformed
    #[error("invalid migration '{origin}': {message}")]
    InvalidMigration { origin: String, message: String },

    #[error("two migrations share version {0}")]
    DuplicateVersion(Version),

    /// The log names a version no registered migration has
    #[error("applied migration {0} is not a known migration")]
    UnknownVersion(Version),

    /// The log is not a prefix of the known migrations in version order
    #[error("applied-migrations log diverged from the known migrations: {message}")]
    LogDiverged { message: String },

    /// Another runner holds the log
    #[error("migration log is locked by another run (lock file '{}')", path.display())]
    Locked { path: PathBuf },

    /// A stop was requested; only checked between units
    #[error("run cancelled after {} migration(s)", completed.len())]
    Cancelled { completed: Vec<Version> },

    /// A unit's mutation or its log update failed; earlier units stay applied
    #[error("migration {version} ({name}) failed while running {direction}: {source}")]
    UnitFailed {
        version: Version,
        name: String,
        direction: MigrationDirection,
        completed: Vec<Version>,
        #[source]
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    pub fn invalid(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMigration {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn diverged(message: impl Into<String>) -> Self {
        Self::LogDiverged {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The innermost cause, looking through [`MigrationError::UnitFailed`]
    pub fn root(&self) -> &MigrationError {
        match self {
            Self::UnitFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Version of the unit that failed, if the error came from a unit
    pub fn failed_version(&self) -> Option<Version> {
        match self {
            Self::UnitFailed { version, .. } => Some(*version),
            _ => None,
        }
    }

    /// Versions that completed before the run stopped
    pub fn completed(&self) -> &[Version] {
        match self {
            Self::UnitFailed { completed, .. } | Self::Cancelled { completed } => completed,
            _ => &[],
        }
    }

    /// A referenced collection or field is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::Schema(e) if e.is_not_found())
    }

    /// The schema store rejected a save
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Schema(e) if e.is_validation())
    }

    /// Persistence (schema file, log file or lock) failed
    pub fn is_io(&self) -> bool {
        match self.root() {
            Self::Schema(e) => e.is_io(),
            Self::Log(_) | Self::Io { .. } => true,
            _ => false,
        }
    }
}
