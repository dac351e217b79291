//! # schemigrate-schema
//!
//! The schema state migrations act on: collections with their field
//! definitions and access rules, an explicit merge patch for rule updates,
//! and the [`SchemaStore`] seam through which the runner reads and saves
//! collections.

pub mod collection;
pub mod error;
pub mod field;
pub mod patch;
pub mod persist;
pub mod store;

pub use collection::{Collection, RuleKind};
pub use error::{SchemaError, SchemaResult};
pub use field::{Field, FieldList};
pub use patch::CollectionPatch;
pub use store::{InMemorySchemaStore, JsonFileSchemaStore, SchemaDocument, SchemaStore};
