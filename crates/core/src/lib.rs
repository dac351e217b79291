pub mod config;
pub mod errors;
pub mod logging;

// Re-export key types for convenience
pub use config::validation::ConfigError;
pub use config::{AppConfigTrait, ConfigOverrides, ConfigSource, Environment, MigrateConfig};
pub use errors::{CoreError, CoreResult};
pub use logging::{init_logging, LoggingConfig};
