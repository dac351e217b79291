//! Migration Rollback - Reverts the most recently applied migrations
//!
//! Reverting walks the log backwards, running each unit's `down` and then
//! dropping its log entry. It stops at the first failure.

use schemigrate_schema::SchemaStore;
use std::time::Instant;

use crate::definitions::{MigrationDirection, RollbackResult};
use crate::error::{MigrationError, MigrationResult};
use crate::log::AppliedLog;
use crate::runner::{check_log_prefix, unit_failed, MigrationRunner};

impl<S: SchemaStore, L: AppliedLog> MigrationRunner<S, L> {
    /// Revert the last `steps` applied migrations, newest first.
    ///
    /// `steps` larger than the log reverts everything; zero does nothing.
    pub async fn revert(&mut self, steps: usize) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let _lock = self.log.acquire().await?;

        let applied = self.log.records().await?;
        check_log_prefix(&self.units, &applied)?;
        let count = steps.min(applied.len());

        let mut rolled_back = Vec::new();
        for record in applied.iter().rev().take(count) {
            if self.stop.is_stopped() {
                tracing::warn!(completed = rolled_back.len(), "rollback cancelled");
                return Err(MigrationError::Cancelled {
                    completed: rolled_back,
                });
            }

            let unit = self
                .units
                .iter()
                .find(|unit| unit.version == record.version)
                .ok_or(MigrationError::UnknownVersion(record.version))?;

            tracing::info!(version = %unit.version, name = %unit.name, "reverting migration");

            if let Err(error) = unit.down.apply(&mut self.schema).await {
                return Err(unit_failed(unit, MigrationDirection::Down, rolled_back, error));
            }
            match self.log.remove_last().await {
                Ok(Some(removed)) if removed.version == unit.version => {}
                Ok(other) => {
                    let error = MigrationError::diverged(format!(
                        "expected to remove {} from the log, removed {}",
                        unit.version,
                        other.map_or_else(|| "nothing".to_string(), |r| r.version.to_string())
                    ));
                    return Err(unit_failed(unit, MigrationDirection::Down, rolled_back, error));
                }
                Err(error) => {
                    return Err(unit_failed(unit, MigrationDirection::Down, rolled_back, error))
                }
            }

            rolled_back.push(unit.version);
        }

        let result = RollbackResult {
            rolled_back_count: rolled_back.len(),
            rolled_back_migrations: rolled_back,
            execution_time_ms: start_time.elapsed().as_millis(),
        };
        tracing::info!(
            reverted = result.rolled_back_count,
            elapsed_ms = result.execution_time_ms as u64,
            "rollback finished"
        );
        Ok(result)
    }

    /// Revert every applied migration
    pub async fn revert_all(&mut self) -> MigrationResult<RollbackResult> {
        self.revert(usize::MAX).await
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::{AppliedRecord, MigrationUnit, Version};
    use crate::error::MigrationError;
    use crate::log::{AppliedLog, MemoryLog};
    use crate::mutation::CollectionChange;
    use crate::registry::MigrationSet;
    use crate::runner::MigrationRunner;
    use crate::signal::StopSignal;
    use crate::testing::{fixture_store, rule_unit, Recorder};
    use schemigrate_schema::{Field, InMemorySchemaStore, RuleKind, SchemaStore};

    fn record(version: u64) -> AppliedRecord {
        AppliedRecord::now(Version::new(version), format!("m{}", version))
    }

    async fn versions(log: &MemoryLog) -> Vec<u64> {
        log.records()
            .await
            .unwrap()
            .iter()
            .map(|r| r.version.value())
            .collect()
    }

    #[tokio::test]
    async fn test_revert_one_runs_only_the_newest_down() {
        let recorder = Recorder::new();
        let set = MigrationSet::new()
            .with(recorder.unit(1, "first"))
            .with(recorder.unit(2, "second"));
        let log = MemoryLog::with_records(vec![record(1), record(2)]);
        let mut runner = MigrationRunner::new(set, fixture_store(), log).unwrap();

        let result = runner.revert(1).await.unwrap();
        assert_eq!(result.rolled_back_migrations, vec![Version::new(2)]);
        assert_eq!(recorder.calls(), vec!["down 2"]);
        assert_eq!(versions(runner.log()).await, vec![1]);
    }

    #[tokio::test]
    async fn test_add_field_then_revert_removes_it() {
        let column = Field::new("relation3906829402", "columnId", "relation")
            .with_option("collectionId", "pbc_1276319826")
            .with_option("maxSelect", 1);
        let set = MigrationSet::new().with(MigrationUnit::new(
            Version::new(1738090971),
            "updated_tasks",
            CollectionChange::new("pbc_2602490748").add_field(6, column),
            CollectionChange::new("pbc_2602490748").remove_field("relation3906829402"),
        ));
        let mut runner = MigrationRunner::new(set, fixture_store(), MemoryLog::new()).unwrap();

        runner.apply_all().await.unwrap();
        let tasks = runner.schema().find_collection("tasks").await.unwrap();
        assert_eq!(tasks.fields.ids(), vec!["text1", "relation1", "relation3906829402"]);

        runner.revert(1).await.unwrap();
        let tasks = runner.schema().find_collection("tasks").await.unwrap();
        assert!(tasks.fields.get_by_id("relation3906829402").is_none());
        assert_eq!(tasks.fields.len(), 2);
        assert!(versions(runner.log()).await.is_empty());
    }

    #[tokio::test]
    async fn test_revert_then_apply_restores_state() {
        let set = MigrationSet::new()
            .with(rule_unit(1, "tasks", RuleKind::View, Some("@request.auth.id != ''")))
            .with(rule_unit(2, "projects", RuleKind::Delete, Some("owner = @request.auth.id")))
            .with(rule_unit(3, "columns", RuleKind::Update, Some("")));
        let mut runner = MigrationRunner::new(set, fixture_store(), MemoryLog::new()).unwrap();

        runner.apply_all().await.unwrap();
        let applied = runner.schema().collections().await.unwrap();

        runner.revert(2).await.unwrap();
        assert_eq!(versions(runner.log()).await, vec![1]);
        let projects = runner.schema().find_collection("projects").await.unwrap();
        assert_eq!(projects.rule(RuleKind::Delete), None);

        runner.apply_all().await.unwrap();
        assert_eq!(runner.schema().collections().await.unwrap(), applied);
    }

    #[tokio::test]
    async fn test_revert_zero_and_revert_past_the_log() {
        let recorder = Recorder::new();
        let set = MigrationSet::new()
            .with(recorder.unit(1, "first"))
            .with(recorder.unit(2, "second"));
        let log = MemoryLog::with_records(vec![record(1), record(2)]);
        let mut runner = MigrationRunner::new(set, fixture_store(), log).unwrap();

        let nothing = runner.revert(0).await.unwrap();
        assert_eq!(nothing.rolled_back_count, 0);
        assert!(recorder.calls().is_empty());

        let everything = runner.revert(10).await.unwrap();
        assert_eq!(
            everything.rolled_back_migrations,
            vec![Version::new(2), Version::new(1)]
        );
        assert_eq!(recorder.calls(), vec!["down 2", "down 1"]);

        let empty = runner.revert_all().await.unwrap();
        assert_eq!(empty.rolled_back_count, 0);
    }

    #[tokio::test]
    async fn test_failing_down_keeps_its_log_entry() {
        let set = MigrationSet::new()
            .with(rule_unit(1, "tasks", RuleKind::View, Some("")))
            .with(MigrationUnit::new(
                Version::new(2),
                "m2",
                CollectionChange::new("tasks"),
                CollectionChange::new("tasks").remove_field("relation3906829402"),
            ));
        let log = MemoryLog::with_records(vec![record(1), record(2)]);
        let mut runner = MigrationRunner::new(set, fixture_store(), log).unwrap();

        let err = runner.revert_all().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.failed_version(), Some(Version::new(2)));
        assert!(err.completed().is_empty());
        assert_eq!(versions(runner.log()).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_logged_version_is_refused() {
        let recorder = Recorder::new();
        let set = MigrationSet::new().with(recorder.unit(1, "first"));
        let log = MemoryLog::with_records(vec![record(1), record(7)]);
        let mut runner = MigrationRunner::new(set, InMemorySchemaStore::new(), log).unwrap();

        assert!(matches!(
            runner.revert(1).await,
            Err(MigrationError::UnknownVersion(v)) if v == Version::new(7)
        ));
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_between_reverts() {
        let recorder = Recorder::new();
        let stop = StopSignal::new();
        let set = MigrationSet::new()
            .with(recorder.unit(1, "first"))
            .with(recorder.unit(2, "second"));
        let log = MemoryLog::with_records(vec![record(1), record(2)]);
        let mut runner = MigrationRunner::new(set, fixture_store(), log)
            .unwrap()
            .with_stop_signal(stop.clone());

        stop.stop();
        let err = runner.revert_all().await.unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled { ref completed } if completed.is_empty()));
        assert!(recorder.calls().is_empty());
        assert_eq!(versions(runner.log()).await, vec![1, 2]);
    }
}
