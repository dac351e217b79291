//! Shared fixtures for the runner and rollback tests.

use async_trait::async_trait;
use schemigrate_schema::{
    Collection, CollectionPatch, Field, InMemorySchemaStore, RuleKind, SchemaError, SchemaStore,
};
use std::sync::{Arc, Mutex};

use crate::definitions::{AppliedRecord, MigrationUnit, Version};
use crate::error::{MigrationError, MigrationResult};
use crate::log::{AppliedLog, LogLock, MemoryLog};
use crate::mutation::{CollectionChange, Mutation};
use crate::signal::StopSignal;

/// Three collections shaped like a small project tracker
pub(crate) fn fixture_store() -> InMemorySchemaStore {
    let mut tasks = Collection::new("pbc_2602490748", "tasks");
    tasks.fields.add(Field::new("text1", "title", "text"));
    tasks.fields.add(Field::new("relation1", "project", "relation"));

    let projects = Collection::new("pbc_484305853", "projects")
        .with_rule(RuleKind::Create, Some("@request.auth.id ~ owner "));
    let columns = Collection::new("pbc_1276319826", "columns").with_rule(
        RuleKind::Update,
        Some("@request.auth.id ~ projects_via_column.assignee.id"),
    );

    InMemorySchemaStore::with_collections(vec![tasks, projects, columns])
}

/// A unit whose up sets one rule to `rule` and whose down clears it
pub(crate) fn rule_unit(
    version: u64,
    collection: &str,
    kind: RuleKind,
    rule: Option<&str>,
) -> MigrationUnit {
    MigrationUnit::new(
        Version::new(version),
        format!("m{}", version),
        CollectionChange::new(collection).update(CollectionPatch::new().with_rule(kind, rule)),
        CollectionChange::new(collection).update(CollectionPatch::new().with_rule(kind, None)),
    )
}

/// Records every mutation call as `"up <version>"` or `"down <version>"`
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn unit(&self, version: u64, name: &str) -> MigrationUnit {
        MigrationUnit::new(
            Version::new(version),
            name,
            self.step(format!("up {}", version), None),
            self.step(format!("down {}", version), None),
        )
    }

    /// Like [`Recorder::unit`], but its up also requests a stop
    pub(crate) fn stopping_unit(
        &self,
        version: u64,
        name: &str,
        stop: StopSignal,
    ) -> MigrationUnit {
        MigrationUnit::new(
            Version::new(version),
            name,
            self.step(format!("up {}", version), Some(stop)),
            self.step(format!("down {}", version), None),
        )
    }

    fn step(&self, label: String, stop: Option<StopSignal>) -> RecordedStep {
        RecordedStep {
            label,
            calls: Arc::clone(&self.calls),
            stop,
        }
    }
}

struct RecordedStep {
    label: String,
    calls: Arc<Mutex<Vec<String>>>,
    stop: Option<StopSignal>,
}

#[async_trait]
impl Mutation for RecordedStep {
    async fn apply(&self, _schema: &mut dyn SchemaStore) -> MigrationResult<()> {
        self.calls.lock().unwrap().push(self.label.clone());
        if let Some(stop) = &self.stop {
            stop.stop();
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Memory log whose appends start failing after `succeed` of them went through
pub(crate) struct FailingAppendLog {
    inner: MemoryLog,
    succeed: usize,
}

impl FailingAppendLog {
    /// `inner` may be a clone kept by the test; clones share the lock
    pub(crate) fn new(inner: MemoryLog, succeed: usize) -> Self {
        Self { inner, succeed }
    }
}

#[async_trait]
impl AppliedLog for FailingAppendLog {
    async fn records(&self) -> MigrationResult<Vec<AppliedRecord>> {
        self.inner.records().await
    }

    async fn append(&mut self, record: AppliedRecord) -> MigrationResult<()> {
        if self.succeed == 0 {
            let source = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            return Err(MigrationError::Log(SchemaError::io("applied.json", source)));
        }
        self.succeed -= 1;
        self.inner.append(record).await
    }

    async fn remove_last(&mut self) -> MigrationResult<Option<AppliedRecord>> {
        self.inner.remove_last().await
    }

    async fn acquire(&self) -> MigrationResult<LogLock> {
        self.inner.acquire().await
    }
}
