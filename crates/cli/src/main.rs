mod commands;

use clap::{Parser, Subcommand};
use commands::migrate;
use schemigrate_core::{init_logging, ConfigOverrides, CoreResult, LoggingConfig, MigrateConfig};
use schemigrate_migrations::StopSignal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "schemigrate")]
#[command(about = "Versioned, reversible migrations for collection schemas")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./schemigrate.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Schema document to migrate
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Applied-migrations log
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Directory holding migration files
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schema migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Create a new migration
    Create {
        /// Migration name
        name: String,

        /// Collection the migration targets (name or id)
        #[arg(long, short)]
        collection: String,
    },

    /// Run pending migrations
    Run,

    /// Roll back the most recently applied migrations
    Rollback {
        /// Number of migrations to roll back
        #[arg(long, default_value = "1")]
        steps: usize,

        /// Roll back every applied migration
        #[arg(long, conflicts_with = "steps")]
        all: bool,
    },

    /// Show migration status
    Status {
        /// Also show each setting and where it came from
        #[arg(long, short)]
        verbose: bool,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            schema_path: self.schema.clone(),
            log_path: self.log.clone(),
            migrations_dir: self.migrations_dir.clone(),
            log_level: self.log_level.clone(),
            json_logs: self.json_logs.then_some(true),
        }
    }
}

fn load_config(cli: &Cli) -> CoreResult<MigrateConfig> {
    let mut config = MigrateConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.overrides())?;
    Ok(config)
}

/// Stop between migrations on Ctrl+C; the unit in progress still finishes.
fn stop_on_interrupt() -> StopSignal {
    let stop = StopSignal::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, stopping after the current migration");
            on_interrupt.stop();
        }
    });
    stop
}

async fn dispatch(command: Commands, config: &MigrateConfig) -> CoreResult<()> {
    match command {
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Create { name, collection } => {
                migrate::create(config, &name, &collection).await?;
            }
            MigrateCommands::Run => {
                migrate::run(config, stop_on_interrupt()).await?;
            }
            MigrateCommands::Rollback { steps, all } => {
                let steps = if all { usize::MAX } else { steps };
                migrate::rollback(config, steps, stop_on_interrupt()).await?;
            }
            MigrateCommands::Status { verbose } => {
                migrate::status(config, verbose).await?;
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(LoggingConfig::from_config(&config)) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match dispatch(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
