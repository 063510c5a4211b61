mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgGroup, Args, Parser, Subcommand};
use mimalloc::MiMalloc;
use resources::config::SeederConfig;
use resources::{SeedCatalog, SeedPlan, TenantDriver, build_store, connect};
use resources_sdk::{MoveDirection, ResourceQuery};
use serde_json::json;

use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Resources initializer - reconciles navigation resources across databases
#[derive(Parser)]
#[command(name = "resources-init")]
#[command(about = "Reconciles navigation resources across master and tenant databases")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile schema and seed data on the configured targets
    Run,
    /// Validate configuration and exit
    Check,
    /// Print one page of resources as JSON
    List(ListArgs),
    /// Move a resource one position up or down within its application
    Move(MoveArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Restrict to one application
    #[arg(long)]
    app: Option<String>,
    /// Case-insensitive text matched against title and description
    #[arg(long)]
    search: Option<String>,
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: u64,
    /// Page size
    #[arg(long, default_value_t = 10)]
    size: u64,
}

#[derive(Args)]
#[command(group(ArgGroup::new("direction").required(true).args(["up", "down"])))]
struct MoveArgs {
    /// Resource id
    #[arg(long)]
    id: i32,
    #[arg(long)]
    up: bool,
    #[arg(long)]
    down: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        bail!("config file does not exist: {}", path.display());
    }

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*)
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose)?;

    if cli.print_config {
        println!("{}", config.to_redacted_json()?);
        return Ok(());
    }

    // Dispatch subcommands (default: run)
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Check => check(&config),
        Commands::List(args) => list(&config, args).await,
        Commands::Move(args) => move_resource(&config, &args).await,
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    let resources = &config.resources;
    if !resources.initializer.enable {
        tracing::info!("Initializer disabled; nothing to reconcile");
        return Ok(());
    }
    let dsn = config.master_dsn()?;

    let mut driver = TenantDriver::new(resources.tenants.clone(), config.database.pool.clone());
    if resources.seeder.enable {
        driver = driver.with_seed(seed_plan(&resources.seeder)?);
    }

    tracing::info!(
        master = resources.initializer.master,
        tenants = resources.initializer.tenants,
        seed = resources.seeder.enable,
        "Reconciling resources"
    );
    let report = driver
        .run(
            dsn,
            resources.initializer.master,
            resources.initializer.tenants,
        )
        .await?;

    for target in &report.targets {
        let status = if target.is_success() { "ok" } else { "failed" };
        println!("{}\t{}\t{status}", target.label, target.dsn);
    }
    Ok(())
}

fn seed_plan(seeder: &SeederConfig) -> Result<SeedPlan> {
    let catalog = match &seeder.catalog_path {
        Some(path) => SeedCatalog::load(path)?,
        None => SeedCatalog::builtin()?,
    };
    tracing::debug!(entries = catalog.len(), "Loaded seed catalog");
    Ok(SeedPlan::new(catalog, seeder.app_names.clone()))
}

fn check(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.master_dsn()?;
    if let Some(path) = &config.resources.seeder.catalog_path {
        SeedCatalog::load(path)?;
    }
    println!("Configuration is valid");
    println!("{}", config.to_redacted_json()?);
    Ok(())
}

async fn list(config: &AppConfig, args: ListArgs) -> Result<()> {
    let conn = connect(config.master_dsn()?, &config.database.pool).await?;
    let store = build_store(config.resources.store, conn);

    let mut query = ResourceQuery::new(args.page, args.size);
    if let Some(app) = args.app {
        query = query.in_app(app);
    }
    if let Some(search) = args.search {
        query = query.with_search(search);
    }

    let page = store.search(&query).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

async fn move_resource(config: &AppConfig, args: &MoveArgs) -> Result<()> {
    let conn = connect(config.master_dsn()?, &config.database.pool).await?;
    let store = build_store(config.resources.store, conn);

    let direction = if args.up {
        MoveDirection::Up
    } else {
        MoveDirection::Down
    };
    let moved = store.reorder(args.id, direction).await?;
    if !moved {
        tracing::info!(id = args.id, ?direction, "Nothing to swap with; order unchanged");
    }
    println!(
        "{}",
        json!({ "id": args.id, "direction": direction, "moved": moved })
    );
    Ok(())
}
