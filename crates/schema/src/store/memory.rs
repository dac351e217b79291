use async_trait::async_trait;

use super::{SchemaDocument, SchemaStore};
use crate::collection::Collection;
use crate::error::SchemaResult;

/// Schema held in process memory; used by tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaStore {
    document: SchemaDocument,
    saves: usize,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(collections: Vec<Collection>) -> Self {
        Self {
            document: SchemaDocument::new(collections),
            saves: 0,
        }
    }

    /// Number of successful saves since creation
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn find_collection(&self, name_or_id: &str) -> SchemaResult<Collection> {
        self.document.find(name_or_id).cloned()
    }

    async fn save(&mut self, collection: Collection) -> SchemaResult<()> {
        self.document.upsert(collection)?;
        self.saves += 1;
        Ok(())
    }

    async fn collections(&self) -> SchemaResult<Vec<Collection>> {
        Ok(self.document.collections().to_vec())
    }
}
