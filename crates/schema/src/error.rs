use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by the schema model and schema stores
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No collection matches the given name or id
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// The collection exists but has no field with this id
    #[error("field '{field}' not found in collection '{collection}'")]
    FieldNotFound { collection: String, field: String },

    /// A save was rejected by the schema constraints
    #[error("collection '{collection}' failed validation: {message}")]
    Validation { collection: String, message: String },

    /// A patch document names an unknown attribute or carries a non-string value
    #[error("invalid collection patch: {0}")]
    InvalidPatch(String),

    #[error("schema store I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Create a validation error for a collection
    pub fn validation(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Attach the path an I/O error happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the error reports a missing collection or field
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound(_) | Self::FieldNotFound { .. }
        )
    }

    /// Check if the error is a rejected save
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if the error comes from the storage layer
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Json(_))
    }
}
