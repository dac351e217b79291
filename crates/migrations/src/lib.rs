//! # schemigrate-migrations
//!
//! Versioned, reversible migrations over a collection schema.
//!
//! A [`MigrationUnit`] pairs an `up` and a `down` [`Mutation`] under a
//! [`Version`]. The [`MigrationRunner`] applies pending units in ascending
//! version order, records each one in an [`AppliedLog`] as soon as it
//! succeeds, and reverts from the newest applied unit backwards.
//!
//! ```no_run
//! use schemigrate_migrations::{JsonFileLog, MigrationManager, MigrationRunner, MigrationSet};
//! use schemigrate_schema::JsonFileSchemaStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let units = MigrationManager::new().load_migrations().await?;
//! let schema = JsonFileSchemaStore::open("pb_data/schema.json").await?;
//! let log = JsonFileLog::new("pb_data/applied_migrations.json");
//!
//! let units: MigrationSet = units.into_iter().collect();
//! let mut runner = MigrationRunner::new(units, schema, log)?;
//! runner.apply_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod definitions;
pub mod error;
pub mod log;
pub mod manager;
pub mod mutation;
pub mod registry;
pub mod rollback;
pub mod runner;
pub mod signal;

#[cfg(test)]
mod testing;

pub use definitions::{
    AppliedRecord, MigrationConfig, MigrationDirection, MigrationRunResult, MigrationStatusReport,
    MigrationUnit, PendingMigration, RollbackResult, Version,
};
pub use error::{MigrationError, MigrationResult};
pub use log::{AppliedLog, JsonFileLog, LogLock, MemoryLog};
pub use manager::MigrationManager;
pub use mutation::{ChangeOp, CollectionChange, Mutation};
pub use registry::MigrationSet;
pub use runner::MigrationRunner;
pub use signal::StopSignal;
