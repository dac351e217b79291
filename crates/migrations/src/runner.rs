//! Migration Runner - Applies migrations against a schema store
//!
//! Units run one at a time in ascending version order. Each applied unit is
//! appended to the log right after its mutation succeeds, so on failure the
//! log and the schema agree on everything that came before.

use schemigrate_schema::SchemaStore;
use std::collections::HashSet;
use std::time::Instant;

use crate::definitions::{
    AppliedRecord, MigrationDirection, MigrationRunResult, MigrationStatusReport, MigrationUnit,
    PendingMigration, Version,
};
use crate::error::{MigrationError, MigrationResult};
use crate::log::AppliedLog;
use crate::registry::MigrationSet;
use crate::signal::StopSignal;

/// Sequential runner over a fixed, version-ordered list of units
pub struct MigrationRunner<S, L> {
    pub(crate) units: Vec<MigrationUnit>,
    pub(crate) schema: S,
    pub(crate) log: L,
    pub(crate) stop: StopSignal,
}

impl<S: SchemaStore, L: AppliedLog> MigrationRunner<S, L> {
    /// Create a runner; fails if two migrations share a version
    pub fn new(migrations: MigrationSet, schema: S, log: L) -> MigrationResult<Self> {
        Ok(Self {
            units: migrations.into_sorted()?,
            schema,
            log,
            stop: StopSignal::new(),
        })
    }

    /// Use an externally owned stop signal (e.g. one wired to Ctrl-C)
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Known units in version order
    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn into_parts(self) -> (S, L) {
        (self.schema, self.log)
    }

    /// Apply every unit newer than the last applied version.
    ///
    /// Stops at the first failure without undoing earlier units. Being up to
    /// date is a successful no-op.
    pub async fn apply_all(&mut self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let _lock = self.log.acquire().await?;

        let applied = self.log.records().await?;
        check_log_prefix(&self.units, &applied)?;
        let last_applied = applied.last().map(|record| record.version);

        let mut completed = Vec::new();
        for unit in self
            .units
            .iter()
            .filter(|unit| last_applied.map_or(true, |last| unit.version > last))
        {
            if self.stop.is_stopped() {
                tracing::warn!(completed = completed.len(), "migration run cancelled");
                return Err(MigrationError::Cancelled { completed });
            }

            tracing::info!(version = %unit.version, name = %unit.name, "applying migration");

            if let Err(error) = unit.up.apply(&mut self.schema).await {
                return Err(unit_failed(unit, MigrationDirection::Up, completed, error));
            }
            if let Err(error) = self
                .log
                .append(AppliedRecord::now(unit.version, &unit.name))
                .await
            {
                return Err(unit_failed(unit, MigrationDirection::Up, completed, error));
            }

            completed.push(unit.version);
        }

        let result = MigrationRunResult {
            applied_count: completed.len(),
            applied_migrations: completed,
            skipped_count: applied.len(),
            execution_time_ms: start_time.elapsed().as_millis(),
        };

        if result.applied_count == 0 {
            tracing::info!(applied = applied.len(), "schema is up to date");
        } else {
            tracing::info!(
                applied = result.applied_count,
                elapsed_ms = result.execution_time_ms as u64,
                "migrations applied"
            );
        }
        Ok(result)
    }

    /// Applied and pending migrations. Reads only, takes no lock.
    pub async fn status(&self) -> MigrationResult<MigrationStatusReport> {
        let applied = self.log.records().await?;
        let applied_versions: HashSet<Version> = applied.iter().map(|r| r.version).collect();

        let pending = self
            .units
            .iter()
            .filter(|unit| !applied_versions.contains(&unit.version))
            .map(|unit| PendingMigration {
                version: unit.version,
                name: unit.name.clone(),
            })
            .collect();

        Ok(MigrationStatusReport { applied, pending })
    }
}

/// Check that `applied` is a prefix of `units`, in order.
pub(crate) fn check_log_prefix(
    units: &[MigrationUnit],
    applied: &[AppliedRecord],
) -> MigrationResult<()> {
    for (position, record) in applied.iter().enumerate() {
        if !units.iter().any(|unit| unit.version == record.version) {
            return Err(MigrationError::UnknownVersion(record.version));
        }

        match units.get(position) {
            Some(unit) if unit.version == record.version => {}
            Some(unit) => {
                return Err(MigrationError::diverged(format!(
                    "expected migration {} at log position {}, found {}",
                    unit.version,
                    position + 1,
                    record.version
                )))
            }
            None => {
                return Err(MigrationError::diverged(format!(
                    "log has {} entries but only {} migrations are known",
                    applied.len(),
                    units.len()
                )))
            }
        }
    }
    Ok(())
}

pub(crate) fn unit_failed(
    unit: &MigrationUnit,
    direction: MigrationDirection,
    completed: Vec<Version>,
    source: MigrationError,
) -> MigrationError {
    tracing::warn!(
        version = %unit.version,
        name = %unit.name,
        %direction,
        error = %source,
        "migration failed"
    );
    MigrationError::UnitFailed {
        version: unit.version,
        name: unit.name.clone(),
        direction,
        completed,
        source: Box::new(source),
    }
}
