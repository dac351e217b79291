use crate::config::validation::{parse_bool, validate_log_level};
use crate::config::{ConfigError, ConfigSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable selecting the [`Environment`]
pub const ENV_ENVIRONMENT: &str = "SCHEMIGRATE_ENV";
/// Environment variable overriding the schema document path
pub const ENV_SCHEMA_PATH: &str = "SCHEMIGRATE_SCHEMA";
/// Environment variable overriding the applied-versions log path
pub const ENV_LOG_PATH: &str = "SCHEMIGRATE_LOG";
/// Environment variable overriding the migrations directory
pub const ENV_MIGRATIONS_DIR: &str = "SCHEMIGRATE_MIGRATIONS_DIR";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "SCHEMIGRATE_LOG_LEVEL";
/// Environment variable toggling JSON log output
pub const ENV_JSON_LOGS: &str = "SCHEMIGRATE_JSON_LOGS";

/// Configuration file picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "schemigrate.yaml";

/// Configuration trait for application configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    /// Check if environment is development
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Check if environment is testing
    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    /// Check if environment is production
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Shape of `schemigrate.yaml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    environment: Option<String>,
    schema_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    migrations_dir: Option<PathBuf>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}

/// Values given explicitly on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub schema_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub migrations_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

/// Runtime configuration of the migration tool
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub environment: Environment,
    /// JSON document holding the collections
    pub schema_path: PathBuf,
    /// JSON document holding the applied-versions log
    pub log_path: PathBuf,
    /// Directory scanned for `<version>_<name>.json` migration files
    pub migrations_dir: PathBuf,
    pub log_level: String,
    pub json_logs: bool,
    sources: HashMap<String, ConfigSource>,
}

impl MigrateConfig {
    /// Create a configuration holding only defaults
    pub fn new() -> Self {
        let mut sources = HashMap::new();
        for (field, value) in [
            ("environment", "development"),
            ("schema_path", "pb_data/schema.json"),
            ("log_path", "pb_data/applied_migrations.json"),
            ("migrations_dir", "pb_migrations"),
            ("log_level", "info"),
            ("json_logs", "based on environment"),
        ] {
            sources.insert(field.to_string(), ConfigSource::Default(value.to_string()));
        }

        Self {
            environment: Environment::Development,
            schema_path: PathBuf::from("pb_data/schema.json"),
            log_path: PathBuf::from("pb_data/applied_migrations.json"),
            migrations_dir: PathBuf::from("pb_migrations"),
            log_level: "info".to_string(),
            json_logs: false,
            sources,
        }
    }

    /// Create configuration for tests, rooted at `dir`
    pub fn testing(dir: &Path) -> Self {
        let mut config = Self::new();
        config.environment = Environment::Testing;
        config.schema_path = dir.join("schema.json");
        config.log_path = dir.join("applied_migrations.json");
        config.migrations_dir = dir.join("migrations");
        config.log_level = "warn".to_string();
        config
    }

    /// Load defaults, then the YAML file, then the process environment.
    ///
    /// When `file` is `None`, `schemigrate.yaml` in the working directory is used if present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        match file {
            Some(path) => config.apply_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.apply_file(default_path)?;
                }
            }
        }

        config.apply_env_from(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a YAML configuration file into this configuration
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileSystemError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let file: FileConfig = serde_yaml::from_str(&content)?;
        let source = ConfigSource::File(path.display().to_string());

        if let Some(environment) = file.environment {
            self.set_environment(environment.parse()?, source.clone());
        }
        if let Some(schema_path) = file.schema_path {
            self.schema_path = schema_path;
            self.record("schema_path", source.clone());
        }
        if let Some(log_path) = file.log_path {
            self.log_path = log_path;
            self.record("log_path", source.clone());
        }
        if let Some(migrations_dir) = file.migrations_dir {
            self.migrations_dir = migrations_dir;
            self.record("migrations_dir", source.clone());
        }
        if let Some(log_level) = file.log_level {
            self.log_level = log_level;
            self.record("log_level", source.clone());
        }
        if let Some(json_logs) = file.json_logs {
            self.json_logs = json_logs;
            self.record("json_logs", source);
        }
        Ok(())
    }

    /// Merge environment variables, read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.set_environment(
                environment.parse()?,
                ConfigSource::EnvVar(ENV_ENVIRONMENT.to_string()),
            );
        }
        if let Some(schema_path) = lookup(ENV_SCHEMA_PATH) {
            self.schema_path = PathBuf::from(schema_path);
            self.record("schema_path", ConfigSource::EnvVar(ENV_SCHEMA_PATH.to_string()));
        }
        if let Some(log_path) = lookup(ENV_LOG_PATH) {
            self.log_path = PathBuf::from(log_path);
            self.record("log_path", ConfigSource::EnvVar(ENV_LOG_PATH.to_string()));
        }
        if let Some(migrations_dir) = lookup(ENV_MIGRATIONS_DIR) {
            self.migrations_dir = PathBuf::from(migrations_dir);
            self.record("migrations_dir", ConfigSource::EnvVar(ENV_MIGRATIONS_DIR.to_string()));
        }
        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = log_level.to_lowercase();
            self.record("log_level", ConfigSource::EnvVar(ENV_LOG_LEVEL.to_string()));
        }
        if let Some(json_logs) = lookup(ENV_JSON_LOGS) {
            self.json_logs = parse_bool("json_logs", &json_logs)?;
            self.record("json_logs", ConfigSource::EnvVar(ENV_JSON_LOGS.to_string()));
        }
        Ok(())
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(schema_path) = overrides.schema_path {
            self.schema_path = schema_path;
            self.record("schema_path", ConfigSource::CliFlag("schema".to_string()));
        }
        if let Some(log_path) = overrides.log_path {
            self.log_path = log_path;
            self.record("log_path", ConfigSource::CliFlag("log".to_string()));
        }
        if let Some(migrations_dir) = overrides.migrations_dir {
            self.migrations_dir = migrations_dir;
            self.record("migrations_dir", ConfigSource::CliFlag("migrations-dir".to_string()));
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
            self.record("log_level", ConfigSource::CliFlag("log-level".to_string()));
        }
        if let Some(json_logs) = overrides.json_logs {
            self.json_logs = json_logs;
            self.record("json_logs", ConfigSource::CliFlag("json-logs".to_string()));
        }
        self.validate()
    }

    /// Changing the environment also moves the default log format, unless the
    /// format was chosen explicitly somewhere.
    fn set_environment(&mut self, environment: Environment, source: ConfigSource) {
        self.environment = environment;
        self.record("environment", source);
        if self.sources.get("json_logs").map_or(true, ConfigSource::is_default) {
            self.json_logs = environment.is_production();
        }
    }

    fn record(&mut self, field: &str, source: ConfigSource) {
        self.sources.insert(field.to_string(), source);
    }
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for MigrateConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.apply_env_from(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_log_level(&self.log_level)?;

        for (field, path) in [
            ("schema_path", &self.schema_path),
            ("log_path", &self.log_path),
            ("migrations_dir", &self.migrations_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::missing_required(
                    field,
                    "an empty path cannot be used",
                ));
            }
        }

        if self.schema_path == self.log_path {
            return Err(ConfigError::invalid_value(
                "log_path",
                self.log_path.display().to_string(),
                "a file distinct from schema_path",
            ));
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}
