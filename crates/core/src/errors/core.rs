use thiserror::Error;

use crate::config::validation::ConfigError;

/// Result alias used by the operator-facing layers
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for the schemigrate tooling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("{context}: {source}")]
    Command {
        context: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CoreError {
    /// Wrap a lower-level error with the operator command that produced it
    pub fn command<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Command {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Configuration could not be loaded or failed validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
