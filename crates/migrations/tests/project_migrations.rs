//! Runs the shipped `pb_migrations/` against a copy of the project tracker schema.

use schemigrate_migrations::{
    JsonFileLog, MigrationConfig, MigrationManager, MigrationRunner, MigrationSet, Version,
};
use schemigrate_schema::{Collection, JsonFileSchemaStore, RuleKind, SchemaStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TASKS: &str = "pbc_2602490748";
const PROJECTS: &str = "pbc_484305853";
const COLUMNS: &str = "pbc_1276319826";
const ASSIGNMENTS: &str = "pbc_2815867050";

fn workspace_file(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

struct Project {
    _dir: TempDir,
    schema_path: PathBuf,
    log_path: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let schema_path = dir.path().join("pb_data").join("schema.json");
        std::fs::create_dir_all(schema_path.parent().unwrap()).unwrap();
        std::fs::copy(workspace_file("tests/fixtures/schema.json"), &schema_path).unwrap();
        let log_path = dir.path().join("pb_data").join("applied_migrations.json");
        Self {
            _dir: dir,
            schema_path,
            log_path,
        }
    }

    /// A fresh runner over the on-disk state, as a new process would build it
    async fn runner(&self) -> MigrationRunner<JsonFileSchemaStore, JsonFileLog> {
        let manager = MigrationManager::with_config(MigrationConfig {
            migrations_dir: workspace_file("../../pb_migrations"),
        });
        let units: MigrationSet = manager.load_migrations().await.unwrap().into_iter().collect();
        let schema = JsonFileSchemaStore::open(&self.schema_path).await.unwrap();
        MigrationRunner::new(units, schema, JsonFileLog::new(&self.log_path)).unwrap()
    }
}

async fn collection(
    runner: &MigrationRunner<JsonFileSchemaStore, JsonFileLog>,
    id: &str,
) -> Collection {
    runner.schema().find_collection(id).await.unwrap()
}

fn fixture_collections() -> Vec<Collection> {
    let content = std::fs::read_to_string(workspace_file("tests/fixtures/schema.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn test_apply_all_reaches_the_final_rules() {
    let project = Project::new();
    let mut runner = project.runner().await;

    let result = runner.apply_all().await.unwrap();
    let versions: Vec<u64> = result.applied_migrations.iter().map(Version::value).collect();
    assert_eq!(
        versions,
        vec![
            1733068582, 1733409472, 1736264202, 1736265555, 1738090971, 1738172447, 1738602520
        ]
    );

    let assignments = collection(&runner, ASSIGNMENTS).await;
    assert_eq!(assignments.rule(RuleKind::List), Some("@request.auth.id ~ assignee"));
    assert_eq!(assignments.rule(RuleKind::Delete), None);

    let tasks = collection(&runner, TASKS).await;
    assert_eq!(tasks.rule(RuleKind::Create), Some("@request.auth.id ?~ assignee.id"));
    assert_eq!(tasks.rule(RuleKind::List), Some("@request.auth.id ?~ assignee.id"));
    assert_eq!(tasks.rule(RuleKind::View), Some("@request.auth.id ?~ assignee.id"));
    assert_eq!(
        tasks.rule(RuleKind::Update),
        Some("project.assignee.id ~ @request.auth.id  ")
    );
    assert_eq!(
        tasks.rule(RuleKind::Delete),
        Some("project.assignee.id ~ @request.auth.id  ")
    );
    let column_id = tasks.fields.iter().position(|f| f.id == "relation3906829402");
    assert_eq!(column_id, Some(6));
    let field = tasks.fields.get_by_name("columnId").unwrap();
    assert_eq!(field.field_type, "relation");
    assert_eq!(field.options["collectionId"], "pbc_1276319826");

    let projects = collection(&runner, PROJECTS).await;
    assert_eq!(projects.rule(RuleKind::Create), Some(""));
    assert_eq!(projects.rule(RuleKind::View), Some("@request.auth.id ?~ assignee.id"));
    assert_eq!(projects.rule(RuleKind::Update), Some("@request.auth.id ~ owner.id"));

    let columns = collection(&runner, COLUMNS).await;
    assert_eq!(columns.rule(RuleKind::Update), Some(""));

    let again = runner.apply_all().await.unwrap();
    assert_eq!(again.applied_count, 0);
    assert_eq!(again.skipped_count, 7);
}

#[tokio::test]
async fn test_partial_revert_uses_recorded_inverses() {
    let project = Project::new();
    project.runner().await.apply_all().await.unwrap();

    let mut runner = project.runner().await;
    let result = runner.revert(2).await.unwrap();
    assert_eq!(
        result.rolled_back_migrations,
        vec![Version::new(1738602520), Version::new(1738172447)]
    );

    // the down of 1738172447 clears the rules instead of restoring the previous ones
    let tasks = collection(&runner, TASKS).await;
    assert_eq!(tasks.rule(RuleKind::Create), Some(""));
    assert_eq!(tasks.rule(RuleKind::List), Some(""));
    assert!(tasks.fields.get_by_id("relation3906829402").is_some());

    let columns = collection(&runner, COLUMNS).await;
    assert_eq!(
        columns.rule(RuleKind::Update),
        Some("@request.auth.id ~ projects_via_column.assignee.id")
    );

    let status = project.runner().await.status().await.unwrap();
    assert_eq!(status.applied.len(), 5);
    assert_eq!(
        status.pending_versions(),
        vec![Version::new(1738172447), Version::new(1738602520)]
    );
}

#[tokio::test]
async fn test_revert_all_restores_the_fixture_and_reapplies() {
    let project = Project::new();
    let mut runner = project.runner().await;
    runner.apply_all().await.unwrap();
    let migrated = runner.schema().collections().await.unwrap();

    let mut runner = project.runner().await;
    let result = runner.revert_all().await.unwrap();
    assert_eq!(result.rolled_back_count, 7);
    assert_eq!(runner.schema().collections().await.unwrap(), fixture_collections());

    let reopened = JsonFileSchemaStore::open(&project.schema_path).await.unwrap();
    assert_eq!(reopened.collections().await.unwrap(), fixture_collections());
    assert!(project.runner().await.status().await.unwrap().applied.is_empty());

    let mut runner = project.runner().await;
    runner.apply_all().await.unwrap();
    assert_eq!(runner.schema().collections().await.unwrap(), migrated);
}

#[tokio::test]
async fn test_failure_stops_at_the_missing_collection() {
    let project = Project::new();
    let mut collections = fixture_collections();
    collections.retain(|c| c.id != COLUMNS);
    std::fs::write(
        &project.schema_path,
        serde_json::to_string_pretty(&collections).unwrap(),
    )
    .unwrap();

    let mut runner = project.runner().await;
    let err = runner.apply_all().await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.failed_version(), Some(Version::new(1738602520)));
    assert_eq!(err.completed().len(), 6);

    let status = project.runner().await.status().await.unwrap();
    assert_eq!(status.pending_versions(), vec![Version::new(1738602520)]);
    assert!(!JsonFileLog::new(&project.log_path).lock_path().exists());
}

#[tokio::test]
async fn test_runner_opened_before_another_run_sees_its_changes() {
    let project = Project::new();
    let mut waiting = project.runner().await;

    project.runner().await.apply_all().await.unwrap();
    waiting.revert(1).await.unwrap();

    let status = project.runner().await.status().await.unwrap();
    assert_eq!(status.applied.len(), 6);

    let reopened = JsonFileSchemaStore::open(&project.schema_path).await.unwrap();
    let tasks = reopened.find_collection(TASKS).await.unwrap();
    assert_eq!(tasks.rule(RuleKind::Create), Some("@request.auth.id ?~ assignee.id"));
    assert!(tasks.fields.get_by_id("relation3906829402").is_some());
    let columns = reopened.find_collection(COLUMNS).await.unwrap();
    assert_eq!(
        columns.rule(RuleKind::Update),
        Some("@request.auth.id ~ projects_via_column.assignee.id")
    );
}
