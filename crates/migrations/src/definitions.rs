//! Migration Definitions - Core types shared by discovery, the log and the runner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MigrationError;
use crate::mutation::Mutation;

/// Migration version: the unix timestamp the migration was created at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Split an identifier of the form `<digits>_<name>` into version and name
    pub fn split_id(id: &str) -> Option<(Version, &str)> {
        let (digits, name) = id.split_once('_')?;
        if name.is_empty() {
            return None;
        }
        Some((digits.parse().ok()?, name))
    }
}

impl FromStr for Version {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrationError::invalid(s, "version must be a unix timestamp"));
        }
        s.parse::<u64>()
            .map(Version)
            .map_err(|e| MigrationError::invalid(s, e.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A versioned pair of forward and backward mutations. Immutable once built.
pub struct MigrationUnit {
    pub version: Version,
    pub name: String,
    pub up: Box<dyn Mutation>,
    pub down: Box<dyn Mutation>,
}

impl MigrationUnit {
    pub fn new(
        version: Version,
        name: impl Into<String>,
        up: impl Mutation + 'static,
        down: impl Mutation + 'static,
    ) -> Self {
        Self {
            version,
            name: name.into(),
            up: Box::new(up),
            down: Box::new(down),
        }
    }

    /// `<version>_<name>`, the identifier migration files are named after
    pub fn id(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    pub fn mutation(&self, direction: MigrationDirection) -> &dyn Mutation {
        match direction {
            MigrationDirection::Up => self.up.as_ref(),
            MigrationDirection::Down => self.down.as_ref(),
        }
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("up", &self.up.describe())
            .field("down", &self.down.describe())
            .finish()
    }
}

/// One entry of the applied-versions log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRecord {
    pub version: Version,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

impl AppliedRecord {
    pub fn now(version: Version, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Configuration for migration discovery
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("pb_migrations"),
        }
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// Versions that were applied, in order
    pub applied_migrations: Vec<Version>,
    /// Number of migrations that were already applied
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// Versions that were rolled back, most recent first
    pub rolled_back_migrations: Vec<Version>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration
    Up,
    /// Roll the migration back
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => f.write_str("up"),
            MigrationDirection::Down => f.write_str("down"),
        }
    }
}

/// A known migration that has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: Version,
    pub name: String,
}

/// Read-only view of the migration state
#[derive(Debug, Clone)]
pub struct MigrationStatusReport {
    /// Log entries, in application order
    pub applied: Vec<AppliedRecord>,
    /// Known migrations not in the log, in version order
    pub pending: Vec<PendingMigration>,
}

impl MigrationStatusReport {
    pub fn applied_versions(&self) -> Vec<Version> {
        self.applied.iter().map(|r| r.version).collect()
    }

    pub fn pending_versions(&self) -> Vec<Version> {
        self.pending.iter().map(|p| p.version).collect()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}
