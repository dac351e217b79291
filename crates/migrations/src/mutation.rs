//! Mutations: what a migration does to the schema in one direction.

use async_trait::async_trait;
use schemigrate_schema::{CollectionPatch, Field, SchemaError, SchemaStore};
use serde::{Deserialize, Serialize};

use crate::error::MigrationResult;

/// One direction of a migration.
///
/// The runner treats mutations as opaque. It never checks that a `down`
/// undoes its `up`.
#[async_trait]
pub trait Mutation: Send + Sync {
    async fn apply(&self, schema: &mut dyn SchemaStore) -> MigrationResult<()>;

    /// Short human-readable summary used in logs and `status` output
    fn describe(&self) -> String;
}

/// A single edit to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ChangeOp {
    /// Merge-patch collection attributes (name and rules)
    Update { set: CollectionPatch },
    /// Insert a field at `index` (clamped), replacing any field with the same id
    AddField { index: usize, field: Field },
    /// Remove the field with this id; missing ids are an error
    RemoveField { id: String },
}

/// Edits applied to one collection and committed with a single save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionChange {
    pub collection: String,
    pub operations: Vec<ChangeOp>,
}

impl CollectionChange {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            operations: Vec::new(),
        }
    }

    pub fn update(mut self, patch: CollectionPatch) -> Self {
        self.operations.push(ChangeOp::Update { set: patch });
        self
    }

    pub fn add_field(mut self, index: usize, field: Field) -> Self {
        self.operations.push(ChangeOp::AddField { index, field });
        self
    }

    pub fn remove_field(mut self, id: impl Into<String>) -> Self {
        self.operations.push(ChangeOp::RemoveField { id: id.into() });
        self
    }
}

#[async_trait]
impl Mutation for CollectionChange {
    async fn apply(&self, schema: &mut dyn SchemaStore) -> MigrationResult<()> {
        let mut collection = schema.find_collection(&self.collection).await?;

        for operation in &self.operations {
            match operation {
                ChangeOp::Update { set } => collection.set_rules(set),
                ChangeOp::AddField { index, field } => {
                    collection.fields.add_at(*index, field.clone())
                }
                ChangeOp::RemoveField { id } => {
                    if collection.fields.remove_by_id(id).is_none() {
                        return Err(SchemaError::FieldNotFound {
                            collection: collection.name.clone(),
                            field: id.clone(),
                        }
                        .into());
                    }
                }
            }
        }

        schema.save(collection).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        let operations: Vec<String> = self
            .operations
            .iter()
            .map(|operation| match operation {
                ChangeOp::Update { set } => {
                    let mut keys: Vec<&str> = set.rules().map(|(kind, _)| kind.key()).collect();
                    if set.name().is_some() {
                        keys.insert(0, "name");
                    }
                    format!("update {}", keys.join(","))
                }
                ChangeOp::AddField { index, field } => {
                    format!("add field {} at {}", field.id, index)
                }
                ChangeOp::RemoveField { id } => format!("remove field {}", id),
            })
            .collect();

        if operations.is_empty() {
            format!("{}: save", self.collection)
        } else {
            format!("{}: {}", self.collection, operations.join("; "))
        }
    }
}
