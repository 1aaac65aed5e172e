//! Shoreline Migration CLI Tool
//!
//! Command-line interface for applying migration units to every tenant database
//! of a MongoDB cluster. Runs as a one-shot container entrypoint: exit status 0
//! when every pending unit was applied, 1 otherwise.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use shoreline::config::{DiscoveryConfig, MigrateConfig};
use shoreline::connection::{connect, wait_until_ready, RetryPolicy};
use shoreline::migration::{
    run_migrations_with, MigrationContext, MigrationRegistry, Migrator, RunError,
};
use shoreline::MongoExecutor;
use shoreline_migrate::builtin_registry;
use shoreline_migrate::generate::generate_migration;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "shoreline-migrate")]
#[command(about = "Migration runner for Shoreline tenant databases")]
#[command(version = "0.1.0")]
struct Cli {
    /// Migrations directory path (overrides MIGRATIONS_DIR)
    #[arg(long)]
    migrations_dir: Option<PathBuf>,

    /// Ledger database name (overrides MIGRATIONS_DB)
    #[arg(long)]
    ledger_db: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Defaults to `up`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations to every target database
    Up {
        /// Dry run - list the (migration, database) pairs that would be executed
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration status per database (applied vs pending)
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// List discovered migration files in run order
    List,

    /// Generate a new migration file
    Generate {
        /// Migration name (e.g., "add_default_positions")
        name: String,
    },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let result = match cli.command.as_ref().unwrap_or(&Commands::Up { dry_run: false }) {
        Commands::Up { dry_run } => handle_up(&cli, *dry_run),
        Commands::Status { json } => handle_status(&cli, *json),
        Commands::List => handle_list(&cli),
        Commands::Generate { name } => handle_generate(&cli, name),
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                println!("{}", "✅ Success".green());
            }
            process::exit(0);
        }
        Err(e) => {
            let code = e.downcast_ref::<RunError>().map_or(1, RunError::exit_code);
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            process::exit(code);
        }
    }
}

/// Environment configuration with the command-line overrides applied
fn load_config(cli: &Cli) -> Result<MigrateConfig, RunError> {
    let mut config = MigrateConfig::load()?;
    if let Some(dir) = &cli.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(ledger_db) = &cli.ledger_db {
        config.ledger_db = ledger_db.clone();
    }
    Ok(config)
}

/// Discovery settings for commands that never touch the cluster, with the same overrides
fn load_discovery(cli: &Cli) -> Result<DiscoveryConfig, RunError> {
    let mut discovery = DiscoveryConfig::load()?;
    if let Some(dir) = &cli.migrations_dir {
        discovery.migrations_dir = dir.clone();
    }
    if let Some(ledger_db) = &cli.ledger_db {
        discovery.ledger_db = ledger_db.clone();
    }
    Ok(discovery)
}

fn connect_ready(config: &MigrateConfig) -> Result<MongoExecutor, RunError> {
    let executor = connect(config)?;
    wait_until_ready(&executor, &RetryPolicy::from_config(config))?;
    Ok(executor)
}

fn registry() -> anyhow::Result<MigrationRegistry> {
    builtin_registry().context("failed to build the migration registry")
}

fn handle_up(cli: &Cli, dry_run: bool) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let registry = registry()?;

    if dry_run {
        let executor = connect_ready(&config)?;
        let migrator = Migrator::from_config(&config);
        let pending = migrator.pending(&executor, &registry).map_err(RunError::from)?;
        if pending.is_empty() {
            println!("No pending migrations to apply");
            return Ok(());
        }

        println!("Would apply {} migration(s):", pending.len());
        for (i, item) in pending.iter().enumerate() {
            println!("  {}. {} → {}", i + 1, item.name, item.database.cyan());
        }
        return Ok(());
    }

    println!("Applying migrations...");
    let executor = connect(&config).map_err(RunError::from)?;
    let summary = run_migrations_with(&executor, &config, &registry, &MigrationContext::new())?;

    if summary.applied > 0 {
        println!(
            "{} Successfully applied {} migration(s) ({} already applied)",
            "✅".green(),
            summary.applied,
            summary.skipped
        );
    } else {
        println!("{} No migrations to apply", "✅".green());
    }

    Ok(())
}

fn handle_status(cli: &Cli, json: bool) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let registry = registry()?;
    let executor = connect_ready(&config)?;

    let migrator = Migrator::from_config(&config);
    let status = migrator.status(&executor, &registry).map_err(RunError::from)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("\n📊 Migration Status\n");

    if status.databases.is_empty() {
        println!("No target databases found");
    }

    for database in &status.databases {
        let marker = if database.is_up_to_date() {
            "✓".green()
        } else {
            "⏳".yellow()
        };
        println!("{} {}", marker, database.database.bold());

        for record in &database.applied {
            println!(
                "    ✓ {} ({})",
                record.name,
                record.executed_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        for name in &database.pending {
            println!("    ⏳ {} {}", name, "(pending)".yellow());
        }
    }

    println!(
        "\n📈 Summary: {} file(s), {} applied, {} pending",
        status.discovered,
        status.applied_count(),
        status.pending_count()
    );

    Ok(())
}

fn handle_list(cli: &Cli) -> anyhow::Result<()> {
    let registry = registry()?;
    let migrator = Migrator::from_discovery(&load_discovery(cli)?);
    let files = migrator.discover_migrations()?;

    if files.is_empty() {
        println!("No migration files found in {}", migrator.migrations_dir().display());
        return Ok(());
    }

    println!("\n📋 Migration Files ({})\n", files.len());
    for (i, file) in files.iter().enumerate() {
        match registry.get(&file.name) {
            Some(unit) => {
                let description = unit.description().unwrap_or("-");
                println!("  {:>3}. {} {} {}", i + 1, "✓".green(), file.name, description.dimmed());
            }
            None => println!(
                "  {:>3}. {} {} {}",
                i + 1,
                "✗".red(),
                file.name,
                "(not registered)".red()
            ),
        }
    }

    let unused: Vec<&str> = registry
        .names()
        .into_iter()
        .filter(|name| !files.iter().any(|file| file.name == *name))
        .collect();
    if !unused.is_empty() {
        println!("\nRegistered without a file (never run):");
        for name in unused {
            println!("  - {}", name.yellow());
        }
    }

    Ok(())
}

fn handle_generate(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let discovery = load_discovery(cli)?;
    let filepath = generate_migration(&discovery.migrations_dir, name, chrono::Utc::now())?;

    println!("{} Generated migration: {}", "✅".green(), filepath.display());
    println!("   Implement execute() and rollback(), then register the unit in builtin_registry()");

    Ok(())
}
