//! Classic Cars - command-line client for the classic cars catalog.
//!
//! Lists, searches and edits the catalog through the remote API. When the
//! API cannot be reached the client switches to demo mode and keeps all
//! changes in local files instead.

mod render;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use classic_cars_core::auth::{resolve_api_key, CredentialStore};
use classic_cars_core::export::ExportFormat;
use classic_cars_core::query::SortOrder;
use classic_cars_core::{ApiClient, App, CarDetails, Config, FileStore, SeedData, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "classic-cars")]
#[command(about = "Browse and manage a classic cars catalog, online or in demo mode")]
#[command(version)]
struct Args {
    /// Path to config file (default: $XDG_CONFIG_HOME/classic-cars/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the cache and demo-mode data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:3000/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List cars
    List(ListArgs),
    /// Show one car
    Show { id: String },
    /// Add a car
    Add(AddArgs),
    /// Change fields of an existing car
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete a car
    Delete { id: String },
    /// Export the (filtered) list as JSON or CSV
    Export {
        /// json or csv
        format: ExportFormat,
        /// Output file (default: classic-cars.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show catalog statistics
    Stats,
    /// Inspect or clear the list cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the API key used for changes
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Only cars whose text contains this term
    #[arg(short, long)]
    search: Option<String>,

    /// Ordering as FIELD-DIR, e.g. price-desc
    #[arg(long)]
    sort: Option<SortOrder>,
}

#[derive(ClapArgs, Debug)]
struct AddArgs {
    #[arg(long)]
    brand: String,
    #[arg(long)]
    model: String,
    #[arg(long)]
    year: i32,
    #[arg(long)]
    color: String,
    /// Price in euros
    #[arg(long)]
    price: f64,
    /// Mileage in km
    #[arg(long)]
    mileage: u64,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

impl From<AddArgs> for CarDetails {
    fn from(args: AddArgs) -> Self {
        CarDetails {
            brand: Some(args.brand),
            model: Some(args.model),
            year: Some(args.year),
            color: Some(args.color),
            price: Some(args.price),
            mileage: Some(args.mileage),
            description: args.description,
            image_url: args.image_url,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    mileage: Option<u64>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

impl From<EditArgs> for CarDetails {
    fn from(args: EditArgs) -> Self {
        CarDetails {
            brand: args.brand,
            model: args.model,
            year: args.year,
            color: args.color,
            price: args.price,
            mileage: args.mileage,
            description: args.description,
            image_url: args.image_url,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show cache age and validity
    Stats,
    /// Drop the cached list
    Clear,
}

#[derive(Subcommand, Debug)]
enum ApiKeyAction {
    /// Store the API key in the OS keychain
    Set { key: String },
    /// Remove the API key from the OS keychain
    Clear,
}

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=classic_cars_core=debug).
/// The returned guard must be held until exit so file logs are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file.as_deref())?;
    info!("Classic Cars starting");

    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    // Keychain commands need neither storage nor network
    let command = match args.command {
        Command::ApiKey { action } => return run_api_key(action),
        command => command,
    };

    let api_url = args.api_url.unwrap_or_else(|| config.effective_api_url());
    let api_key = if needs_api_key(&command) {
        resolve_api_key(&config).map(|(key, _)| key)
    } else {
        None
    };
    let client = ApiClient::with_base_url(&api_url)?.with_api_key(api_key);

    let storage_dir = config.storage_dir()?;
    let store = FileStore::new(storage_dir)?;
    let mut app = App::new(
        client,
        Arc::new(store),
        Arc::new(SystemClock),
        SeedData::bundled(),
    );
    app.sort = config.default_sort_order();

    run(&mut app, command).await
}

/// Only commands that change the catalog send the API key.
fn needs_api_key(command: &Command) -> bool {
    matches!(
        command,
        Command::Add(_) | Command::Edit { .. } | Command::Delete { .. }
    )
}

fn run_api_key(action: ApiKeyAction) -> Result<()> {
    match action {
        ApiKeyAction::Set { key } => {
            CredentialStore::store_api_key(key.trim())?;
            println!("API key saved to the keychain.");
        }
        ApiKeyAction::Clear => {
            CredentialStore::delete_api_key()?;
            println!("API key removed from the keychain.");
        }
    }
    Ok(())
}

fn apply_list_args(app: &mut App<ApiClient>, list: ListArgs) {
    if let Some(search) = list.search {
        app.search_query = search;
    }
    if let Some(sort) = list.sort {
        app.sort = Some(sort);
    }
}

/// Print the session status line to stderr so stdout stays pipeable.
fn report_status(app: &App<ApiClient>) {
    if let Some(ref message) = app.status_message {
        eprintln!("{}", message);
    }
}

async fn run(app: &mut App<ApiClient>, command: Command) -> Result<()> {
    // Cache commands inspect storage as it is, without loading anything
    let command = match command {
        Command::Cache { action } => {
            match action {
                CacheAction::Stats => render::print_cache_stats(&app.cache_stats()),
                CacheAction::Clear => {
                    app.clear_cache();
                    println!("Cache cleared.");
                }
            }
            return Ok(());
        }
        command => command,
    };

    app.startup().await;
    report_status(app);

    match command {
        Command::List(list) => {
            apply_list_args(app, list);
            render::print_car_table(&app.visible_cars());
        }
        Command::Show { id } => {
            let id = app.canonical_id(&id);
            let car = app
                .load_car(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Car not found: {}", id))?;
            render::print_car_details(&car);
        }
        Command::Add(fields) => {
            let car = app.create_car(fields.into()).await?;
            report_status(app);
            println!("Added {} ({})", car.title(), car.id);
        }
        Command::Edit { id, fields } => {
            let patch: CarDetails = fields.into();
            let id = app.canonical_id(&id);
            let current = app
                .load_car(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Car not found: {}", id))?;
            let mut details = current.details;
            details.merge(&patch);

            let car = app.update_car(&current.id, details).await?;
            report_status(app);
            println!("Updated {} ({})", car.title(), car.id);
        }
        Command::Delete { id } => {
            let id = app.canonical_id(&id);
            app.delete_car(&id).await?;
            report_status(app);
            println!("Deleted {}", id);
        }
        Command::Export {
            format,
            output,
            list,
        } => {
            apply_list_args(app, list);
            let Some(contents) = format.render(&app.visible_cars())? else {
                println!("Nothing to export.");
                return Ok(());
            };
            let path = output.unwrap_or_else(|| PathBuf::from(format.default_filename()));
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} to {}", format, path.display());
        }
        Command::Stats => {
            render::print_stats(&app.stats());
        }
        // Handled before startup
        Command::Cache { .. } | Command::ApiKey { .. } => {}
    }

    Ok(())
}
