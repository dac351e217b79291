//! Migration Manager - File system operations for migrations
//!
//! Discovers `<version>_<name>.json` migration files and creates new ones.
//! A migration file targets one collection:
//!
//! ```json
//! {
//!   "collection": "pbc_2602490748",
//!   "up":   [{ "op": "removeField", "id": "relation3906829402" }],
//!   "down": [{
//!     "op": "addField",
//!     "index": 6,
//!     "field": { "id": "relation3906829402", "name": "columnId", "type": "relation" }
//!   }]
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::definitions::{MigrationConfig, MigrationUnit, Version};
use crate::error::{MigrationError, MigrationResult};
use crate::mutation::{ChangeOp, CollectionChange};

/// On-disk body of a migration file
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrationFile {
    collection: String,
    #[serde(default)]
    up: Vec<ChangeOp>,
    #[serde(default)]
    down: Vec<ChangeOp>,
}

/// Migration manager for creating and loading migration files
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Create a new migration file for `collection` and return its file name
    pub async fn create_migration(&self, name: &str, collection: &str) -> MigrationResult<String> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(MigrationError::invalid(
                name,
                "migration name must contain letters or digits",
            ));
        }
        if collection.trim().is_empty() {
            return Err(MigrationError::invalid(name, "target collection cannot be empty"));
        }

        let dir = &self.config.migrations_dir;
        fs::create_dir_all(dir).map_err(|e| MigrationError::io(dir, e))?;

        let version = Version::new(Utc::now().timestamp().max(0) as u64);
        let filename = format!("{}_{}.json", version, slug);
        let filepath = dir.join(&filename);

        let template = MigrationFile {
            collection: collection.to_string(),
            up: Vec::new(),
            down: Vec::new(),
        };
        let mut body = serde_json::to_string_pretty(&template)
            .map_err(|e| MigrationError::invalid(&filename, e.to_string()))?;
        body.push('\n');

        // create_new: two migrations created within the same second must not overwrite each other
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&filepath)
            .map_err(|e| MigrationError::io(&filepath, e))?;
        file.write_all(body.as_bytes())
            .map_err(|e| MigrationError::io(&filepath, e))?;

        tracing::info!(file = %filename, collection, "created migration");
        Ok(filename)
    }

    /// Load all migration files from the migrations directory, sorted by version
    pub async fn load_migrations(&self) -> MigrationResult<Vec<MigrationUnit>> {
        let dir = &self.config.migrations_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut migrations = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| MigrationError::io(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::io(dir, e))?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                migrations.push(self.parse_migration_file(&path)?);
            }
        }

        migrations.sort_by_key(|m: &MigrationUnit| m.version);
        tracing::debug!(dir = %dir.display(), count = migrations.len(), "loaded migrations");
        Ok(migrations)
    }

    /// Parse a migration file into a MigrationUnit
    fn parse_migration_file(&self, path: &Path) -> MigrationResult<MigrationUnit> {
        let origin = path.display().to_string();

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| MigrationError::invalid(&origin, "file name is not valid UTF-8"))?;
        let (version, name) = Version::split_id(stem).ok_or_else(|| {
            MigrationError::invalid(&origin, "file name must follow <timestamp>_<name>.json")
        })?;

        let content = fs::read_to_string(path).map_err(|e| MigrationError::io(path, e))?;
        let file: MigrationFile = serde_json::from_str(&content)
            .map_err(|e| MigrationError::invalid(&origin, e.to_string()))?;

        if file.collection.trim().is_empty() {
            return Err(MigrationError::invalid(&origin, "\"collection\" cannot be empty"));
        }

        Ok(MigrationUnit::new(
            version,
            name,
            CollectionChange {
                collection: file.collection.clone(),
                operations: file.up,
            },
            CollectionChange {
                collection: file.collection,
                operations: file.down,
            },
        ))
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `"updated tasks"` -> `"updated_tasks"`; case is kept
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
