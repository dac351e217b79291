use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{SchemaDocument, SchemaStore};
use crate::collection::Collection;
use crate::error::SchemaResult;
use crate::persist::{read_json, write_json};

/// Schema kept as a JSON array of collection documents on disk.
///
/// Nothing is cached: every lookup reads the file, and every save reads it,
/// applies the change and rewrites the whole document through a temp file
/// and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileSchemaStore {
    path: PathBuf,
}

impl JsonFileSchemaStore {
    /// Open the store, checking the file parses; a missing file is an empty schema
    pub async fn open(path: impl Into<PathBuf>) -> SchemaResult<Self> {
        let store = Self { path: path.into() };
        let document = store.load().await?;
        tracing::debug!(
            path = %store.path.display(),
            collections = document.len(),
            "opened schema store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current on-disk document
    pub async fn load(&self) -> SchemaResult<SchemaDocument> {
        Ok(read_json::<SchemaDocument>(&self.path)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl SchemaStore for JsonFileSchemaStore {
    async fn find_collection(&self, name_or_id: &str) -> SchemaResult<Collection> {
        self.load().await?.find(name_or_id).cloned()
    }

    async fn save(&mut self, collection: Collection) -> SchemaResult<()> {
        let mut document = self.load().await?;
        let id = collection.id.clone();
        document.upsert(collection)?;

        write_json(&self.path, &document).await?;

        tracing::debug!(collection = %id, path = %self.path.display(), "saved collection");
        Ok(())
    }

    async fn collections(&self) -> SchemaResult<Vec<Collection>> {
        Ok(self.load().await?.collections().to_vec())
    }
}
