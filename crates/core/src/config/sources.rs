use std::fmt;

/// Layer a configuration value was taken from, lowest precedence first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default; holds the value as shown to operators
    Default(String),
    /// `schemigrate.yaml` or the file given with `--config`
    File(String),
    /// Environment variable name
    EnvVar(String),
    /// Command-line flag name, without the leading dashes
    CliFlag(String),
}

impl ConfigSource {
    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ConfigSource::File(_))
    }

    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    pub fn is_cli_flag(&self) -> bool {
        matches!(self, ConfigSource::CliFlag(_))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default(value) => write!(f, "default ({})", value),
            ConfigSource::File(path) => write!(f, "file {}", path),
            ConfigSource::EnvVar(var) => write!(f, "env {}", var),
            ConfigSource::CliFlag(flag) => write!(f, "flag --{}", flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_layer() {
        assert_eq!(
            ConfigSource::Default("pb_migrations".to_string()).to_string(),
            "default (pb_migrations)"
        );
        assert_eq!(
            ConfigSource::EnvVar("SCHEMIGRATE_SCHEMA".to_string()).to_string(),
            "env SCHEMIGRATE_SCHEMA"
        );
        assert_eq!(
            ConfigSource::CliFlag("migrations-dir".to_string()).to_string(),
            "flag --migrations-dir"
        );
        assert!(ConfigSource::File("schemigrate.yaml".to_string()).is_file());
        assert!(ConfigSource::CliFlag("log".to_string()).is_cli_flag());
    }
}
