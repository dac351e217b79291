use schemigrate_core::{AppConfigTrait, CoreError, CoreResult, MigrateConfig};
use schemigrate_migrations::{
    JsonFileLog, MigrationConfig, MigrationManager, MigrationRunner, MigrationSet, StopSignal,
};
use schemigrate_schema::JsonFileSchemaStore;

fn manager(config: &MigrateConfig) -> MigrationManager {
    MigrationManager::with_config(MigrationConfig {
        migrations_dir: config.migrations_dir.clone(),
    })
}

async fn open_runner(
    config: &MigrateConfig,
    stop: StopSignal,
) -> CoreResult<MigrationRunner<JsonFileSchemaStore, JsonFileLog>> {
    let units: MigrationSet = manager(config)
        .load_migrations()
        .await
        .map_err(|e| CoreError::command("Failed to load migrations", e))?
        .into_iter()
        .collect();
    let schema = JsonFileSchemaStore::open(&config.schema_path)
        .await
        .map_err(|e| CoreError::command("Failed to open schema", e))?;
    let log = JsonFileLog::new(&config.log_path);

    let runner = MigrationRunner::new(units, schema, log)
        .map_err(|e| CoreError::command("Invalid migration set", e))?;
    Ok(runner.with_stop_signal(stop))
}

pub async fn create(config: &MigrateConfig, name: &str, collection: &str) -> CoreResult<()> {
    let filename = manager(config)
        .create_migration(name, collection)
        .await
        .map_err(|e| CoreError::command("Failed to create migration", e))?;

    println!(
        "Created migration: {}",
        config.migrations_dir.join(filename).display()
    );
    Ok(())
}

pub async fn run(config: &MigrateConfig, stop: StopSignal) -> CoreResult<()> {
    let mut runner = open_runner(config, stop).await?;

    match runner.apply_all().await {
        Ok(result) if result.applied_count == 0 => {
            println!("Nothing to migrate ({} already applied)", result.skipped_count);
            Ok(())
        }
        Ok(result) => {
            for version in &result.applied_migrations {
                println!("  ✅ {}", version);
            }
            println!(
                "Applied {} migration(s) in {}ms",
                result.applied_count, result.execution_time_ms
            );
            Ok(())
        }
        Err(e) => {
            for version in e.completed() {
                println!("  ✅ {}", version);
            }
            if let Some(version) = e.failed_version() {
                println!("  ❌ {}", version);
            }
            Err(CoreError::command("Migration run stopped", e))
        }
    }
}

pub async fn rollback(config: &MigrateConfig, steps: usize, stop: StopSignal) -> CoreResult<()> {
    let mut runner = open_runner(config, stop).await?;

    match runner.revert(steps).await {
        Ok(result) if result.rolled_back_count == 0 => {
            println!("Nothing to roll back");
            Ok(())
        }
        Ok(result) => {
            for version in &result.rolled_back_migrations {
                println!("  ↩️  {}", version);
            }
            println!(
                "Rolled back {} migration(s) in {}ms",
                result.rolled_back_count, result.execution_time_ms
            );
            Ok(())
        }
        Err(e) => {
            for version in e.completed() {
                println!("  ↩️  {}", version);
            }
            if let Some(version) = e.failed_version() {
                println!("  ❌ {}", version);
            }
            Err(CoreError::command("Rollback stopped", e))
        }
    }
}

pub async fn status(config: &MigrateConfig, verbose: bool) -> CoreResult<()> {
    let runner = open_runner(config, StopSignal::new()).await?;
    let report = runner
        .status()
        .await
        .map_err(|e| CoreError::command("Failed to read migration status", e))?;

    println!("Migration Status:");
    println!("================");

    if verbose {
        print_config_sources(config);
    }

    if report.applied.is_empty() && report.pending.is_empty() {
        println!("No migrations found in {}", config.migrations_dir.display());
        return Ok(());
    }

    for record in &report.applied {
        println!(
            "  ✅ {}_{} (applied {})",
            record.version,
            record.name,
            record.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    for pending in &report.pending {
        println!("  ⏳ {}_{}", pending.version, pending.name);
    }
    println!(
        "\n{} applied, {} pending",
        report.applied.len(),
        report.pending.len()
    );

    Ok(())
}

/// Each setting with its value and the layer it came from
fn config_source_lines(config: &MigrateConfig) -> Vec<String> {
    let sources = config.config_sources();
    let values = [
        ("environment", config.environment.to_string()),
        ("schema_path", config.schema_path.display().to_string()),
        ("log_path", config.log_path.display().to_string()),
        ("migrations_dir", config.migrations_dir.display().to_string()),
        ("log_level", config.log_level.clone()),
        ("json_logs", config.json_logs.to_string()),
    ];

    values
        .iter()
        .map(|(field, value)| match sources.get(*field) {
            Some(source) => format!("{} = {} [{}]", field, value, source),
            None => format!("{} = {}", field, value),
        })
        .collect()
}

fn print_config_sources(config: &MigrateConfig) {
    println!("Configuration:");
    for line in config_source_lines(config) {
        println!("  {}", line);
    }
    println!();
}
