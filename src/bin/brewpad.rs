use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use brewpad_catalog::app::{App, EventSink};
use brewpad_catalog::config::{ConfigLoader, ResolvedConfig};
use brewpad_catalog::convert::convert;
use brewpad_catalog::domain::{CatalogEntry, Category};
use brewpad_catalog::error::BrewpadError;
use brewpad_catalog::output::{JsonOutput, LogSink, OutputMode};
use brewpad_catalog::remote::{HealthStatus, RemoteHttpClient, RemoteIndexClient};
use brewpad_catalog::store::{CatalogStore, DeleteOutcome};
use brewpad_catalog::sync::{SyncOutcome, SyncReport};

#[derive(Parser)]
#[command(name = "brewpad")]
#[command(about = "Brewpad recipe catalog: sync, browse and unit conversion")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (default: ./brewpad.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load the catalog and sync, waiting for readiness")]
    Start(StartArgs),
    #[command(about = "Run one sync cycle against the recipe server")]
    Sync,
    #[command(about = "List recipes")]
    List(ListArgs),
    #[command(about = "List weekly features and community highlights")]
    Featured,
    #[command(about = "Show one recipe by name or id")]
    Show(ShowArgs),
    #[command(about = "Convert measurements in a line of text")]
    Convert(ConvertArgs),
    #[command(about = "Delete a user recipe")]
    Delete(KeyArgs),
    #[command(about = "Import a shared recipe file as a local copy")]
    Import(ImportArgs),
    #[command(about = "Export a recipe as a shareable .brewpadrecipe file")]
    Export(ExportArgs),
    #[command(about = "Check whether the recipe server is reachable")]
    Health,
}

#[derive(Args)]
struct StartArgs {
    /// Give up waiting for readiness after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    category: Option<Category>,
}

#[derive(Args)]
struct ShowArgs {
    key: String,
    #[arg(long, conflicts_with = "metric")]
    imperial: bool,
    #[arg(long)]
    metric: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitSystem {
    Imperial,
    Metric,
}

#[derive(Args)]
struct ConvertArgs {
    text: String,
    #[arg(long, value_enum, default_value_t = UnitSystem::Imperial)]
    to: UnitSystem,
}

#[derive(Args)]
struct KeyArgs {
    key: String,
}

#[derive(Args)]
struct ImportArgs {
    path: Utf8PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    key: String,
    #[arg(long, default_value = ".")]
    out: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(brewpad) = report.downcast_ref::<BrewpadError>() {
            return ExitCode::from(map_exit_code(brewpad));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BrewpadError) -> u8 {
    match error {
        BrewpadError::EntryNotFound(_) => 2,
        BrewpadError::ConfigRead(_)
        | BrewpadError::ConfigParse(_)
        | BrewpadError::InvalidBirthday(_) => 2,
        BrewpadError::RemoteHttp(_) | BrewpadError::RemoteStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    if let Commands::Convert(args) = &cli.command {
        let converted = convert(&args.text, matches!(args.to, UnitSystem::Imperial));
        return match mode {
            OutputMode::Json => JsonOutput::print_value(&converted).into_diagnostic(),
            OutputMode::Human => {
                println!("{converted}");
                Ok(())
            }
        };
    }

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = CatalogStore::new_with_paths(config.recipes_dir.clone());
    let sink: Arc<dyn EventSink + Send + Sync> = match mode {
        OutputMode::Json => Arc::new(JsonOutput),
        OutputMode::Human => Arc::new(LogSink),
    };

    match cli.command {
        Commands::Start(args) => {
            let app = online_app(config, store, sink)?;
            let result = app.start(Duration::from_secs(args.timeout));
            match mode {
                OutputMode::Json => JsonOutput::print_startup(&result).into_diagnostic(),
                OutputMode::Human => {
                    println!(
                        "ready: {} ({} local, {} in catalog)",
                        result.ready,
                        result.local_entries,
                        app.catalog().len()
                    );
                    print_sync_summary(&result.sync);
                    Ok(())
                }
            }
        }
        Commands::Sync => {
            let app = online_app(config, store, sink)?;
            let report = app.refresh(|_| {});
            match mode {
                OutputMode::Json => JsonOutput::print_sync(&report).into_diagnostic(),
                OutputMode::Human => {
                    print_sync_summary(&report);
                    Ok(())
                }
            }
        }
        Commands::Health => {
            let app = online_app(config, store, sink)?;
            let status = app.check_health();
            match mode {
                OutputMode::Json => JsonOutput::print_health(&status).into_diagnostic(),
                OutputMode::Human => {
                    print_health(&status);
                    Ok(())
                }
            }
        }
        Commands::List(args) => {
            let app = offline_app(config, store, sink);
            let result = app.list(args.category);
            match mode {
                OutputMode::Json => JsonOutput::print_list(&result).into_diagnostic(),
                OutputMode::Human => {
                    for entry in &result.entries {
                        print_entry_line(entry);
                    }
                    Ok(())
                }
            }
        }
        Commands::Featured => {
            let app = offline_app(config, store, sink);
            let result = app.featured();
            match mode {
                OutputMode::Json => JsonOutput::print_featured(&result).into_diagnostic(),
                OutputMode::Human => {
                    println!("Weekly features:");
                    for entry in &result.weekly_features {
                        print_entry_line(entry);
                    }
                    println!("Community highlights:");
                    for entry in &result.community_highlights {
                        print_entry_line(entry);
                    }
                    Ok(())
                }
            }
        }
        Commands::Show(args) => {
            let app = offline_app(config, store, sink);
            let to_imperial = match (args.imperial, args.metric) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let entry = app.show(&args.key, to_imperial)?;
            match mode {
                OutputMode::Json => JsonOutput::print_entry(&entry).into_diagnostic(),
                OutputMode::Human => {
                    print_entry(&entry);
                    Ok(())
                }
            }
        }
        Commands::Delete(args) => {
            let app = offline_app(config, store, sink);
            let result = app.delete_entry(&args.key)?;
            match mode {
                OutputMode::Json => JsonOutput::print_delete(&result).into_diagnostic(),
                OutputMode::Human => {
                    match result.outcome {
                        DeleteOutcome::Removed => println!("deleted {}", result.name),
                        DeleteOutcome::Refused => {
                            println!("{} is a Brewpad recipe and cannot be deleted", result.name)
                        }
                        DeleteOutcome::NotFound => println!("no file found for {}", result.name),
                    }
                    Ok(())
                }
            }
        }
        Commands::Import(args) => {
            let app = offline_app(config, store, sink);
            let result = app.import_file(&args.path)?;
            match mode {
                OutputMode::Json => JsonOutput::print_save(&result).into_diagnostic(),
                OutputMode::Human => {
                    println!("imported {} -> {}", result.name, result.path);
                    Ok(())
                }
            }
        }
        Commands::Export(args) => {
            let app = offline_app(config, store, sink);
            let path = app.export_entry(&args.key, &args.out)?;
            match mode {
                OutputMode::Json => JsonOutput::print_value(&path.as_str()).into_diagnostic(),
                OutputMode::Human => {
                    println!("exported to {path}");
                    Ok(())
                }
            }
        }
        Commands::Convert(_) => Ok(()),
    }
}

fn online_app(
    config: ResolvedConfig,
    store: CatalogStore,
    sink: Arc<dyn EventSink + Send + Sync>,
) -> miette::Result<App<RemoteHttpClient>> {
    let remote = RemoteHttpClient::new(
        &config.server_base_url,
        &config.health_url,
        config.request_timeout,
    )?;
    Ok(App::new(config, store, remote, sink))
}

fn offline_app(
    config: ResolvedConfig,
    store: CatalogStore,
    sink: Arc<dyn EventSink + Send + Sync>,
) -> App<OfflineRemote> {
    let app = App::new(config, store, OfflineRemote, sink);
    app.load_local();
    app
}

fn print_sync_summary(report: &SyncReport) {
    let outcome = match report.outcome() {
        SyncOutcome::Success => "complete",
        SyncOutcome::Partial => "partial",
    };
    println!("sync {outcome}");
    if !report.listing_reachable {
        println!("  recipe server unreachable; showing local recipes");
    }
    println!("  listed: {}", report.listed.len());
    println!("  downloaded: {}", report.downloaded.len());
    println!("  pruned: {}", report.pruned.len());
    for item in &report.failed {
        println!("  failed: {} ({})", item.file_name, item.reason);
    }
    if report.skipped_local > 0 {
        println!("  skipped unreadable local files: {}", report.skipped_local);
    }
    println!("  recipes in catalog: {}", report.entries);
}

fn print_health(status: &HealthStatus) {
    let state = if status.reachable {
        "reachable"
    } else {
        "unreachable"
    };
    println!("recipe server {state}: {}", status.message);
}

fn print_entry_line(entry: &CatalogEntry) {
    let mut tags = Vec::new();
    if entry.is_built_in {
        tags.push("built-in");
    }
    if entry.is_weekly_feature {
        tags.push("weekly");
    }
    if entry.is_community_highlight {
        tags.push("community");
    }
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    };
    println!(
        "{}  {:<10} {} by {}{tags}",
        entry.id(),
        entry.category.as_str(),
        entry.name,
        entry.creator
    );
}

fn print_entry(entry: &CatalogEntry) {
    println!("{} ({})", entry.name, entry.category);
    println!("by {}", entry.creator);
    println!();
    println!("{}", entry.description);
    println!();
    println!("Ingredients:");
    for line in &entry.ingredients {
        println!("  - {line}");
    }
    println!("Preparation:");
    for (index, line) in entry.preparations.iter().enumerate() {
        println!("  {}. {line}", index + 1);
    }
}

/// Stand-in remote for commands that only read the local catalog.
struct OfflineRemote;

impl RemoteIndexClient for OfflineRemote {
    fn fetch_listing(&self) -> Result<Vec<String>, BrewpadError> {
        Err(BrewpadError::RemoteHttp("offline".to_string()))
    }

    fn download_one(&self, _name: &str) -> Result<Vec<u8>, BrewpadError> {
        Err(BrewpadError::RemoteHttp("offline".to_string()))
    }

    fn check_health(&self) -> HealthStatus {
        HealthStatus {
            reachable: false,
            status: None,
            message: "Error: offline".to_string(),
        }
    }
}
