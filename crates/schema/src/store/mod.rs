//! Schema stores: where collections are read from and saved to.

mod file;
mod memory;

pub use file::JsonFileSchemaStore;
pub use memory::InMemorySchemaStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{SchemaError, SchemaResult};

/// Access to the host platform's schema.
///
/// `save` is all-or-nothing: when it returns an error the stored schema is
/// exactly what it was before the call.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Look a collection up by id, or by name (case-insensitive)
    async fn find_collection(&self, name_or_id: &str) -> SchemaResult<Collection>;

    /// Validate and persist a collection, inserting it when its id is new
    async fn save(&mut self, collection: Collection) -> SchemaResult<()>;

    /// Every collection, in storage order
    async fn collections(&self) -> SchemaResult<Vec<Collection>>;
}

/// The full set of collections, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    collections: Vec<Collection>,
}

impl SchemaDocument {
    pub fn new(collections: Vec<Collection>) -> Self {
        Self { collections }
    }

    /// Ids win over names so a collection named like another's id is still reachable by id
    pub fn find(&self, name_or_id: &str) -> SchemaResult<&Collection> {
        self.collections
            .iter()
            .find(|c| c.id == name_or_id)
            .or_else(|| self.collections.iter().find(|c| c.matches(name_or_id)))
            .ok_or_else(|| SchemaError::CollectionNotFound(name_or_id.to_string()))
    }

    /// Validate `collection` against itself and its siblings, then store it
    pub fn upsert(&mut self, collection: Collection) -> SchemaResult<()> {
        collection.validate()?;

        if let Some(clash) = self
            .collections
            .iter()
            .find(|c| c.id != collection.id && c.name.eq_ignore_ascii_case(&collection.name))
        {
            return Err(SchemaError::validation(
                &collection.name,
                format!("collection name already used by '{}'", clash.id),
            ));
        }

        match self.collections.iter_mut().find(|c| c.id == collection.id) {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
        Ok(())
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
