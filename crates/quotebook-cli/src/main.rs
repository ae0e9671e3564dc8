//! Quotebook CLI
//!
//! Command-line interface for Quotebook - a local quote collection with
//! category filtering, JSON import/export and remote reconciliation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quotebook_core::{Config, StorageError, Store};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "QUOTEBOOK_LOG";

#[derive(Parser)]
#[command(name = "quotebook")]
#[command(about = "Quotebook - a local quote collection that syncs")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a quote
    Add {
        /// Quote text
        text: String,
        /// Category for the quote
        #[arg(short, long)]
        category: String,
    },
    /// List quotes
    #[command(alias = "ls")]
    List {
        /// Only this category ("all" for every quote); defaults to the saved filter
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories with quote counts
    Categories,
    /// Show or change the saved category filter
    Filter {
        #[command(subcommand)]
        command: Option<FilterCommands>,
    },
    /// Show a random quote
    Show {
        /// Pick from this category instead of the saved filter
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Export all quotes as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import quotes from a JSON file
    Import {
        /// File containing a JSON array of quotes
        file: PathBuf,
    },
    /// Reconcile once with the remote quote source
    Sync,
    /// Reconcile on a schedule until interrupted
    Watch {
        /// Seconds between cycles (defaults to sync_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show store and sync status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum FilterCommands {
    /// Show the saved filter
    Show,
    /// Save a filter ("all" clears it)
    Set {
        /// Category name or "all"
        value: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, sync_url, sync_enabled, sync_interval_secs,
        /// sync_timeout_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file directly and never open the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())?;
    init_logging(&config, cli.verbose);

    let mut store = Store::open_with_config(&config);

    // Reads pick up remote changes first when sync is configured
    let is_read = matches!(
        &cli.command,
        Commands::List { .. } | Commands::Categories | Commands::Show { .. }
    );
    if is_read {
        store = commands::sync::auto_sync(store, &config, &output).await;
    }

    let result = match cli.command {
        Commands::Add { text, category } => {
            commands::quote::add(&mut store, &text, &category, &output)
        }
        Commands::List { category } => commands::quote::list(&store, category, &output),
        Commands::Categories => commands::category::list(&store, &output),
        Commands::Filter { command } => handle_filter_command(command, &mut store, &output),
        Commands::Show { category } => commands::quote::show(&mut store, category, &output),
        Commands::Export { output: path } => commands::transfer::export(&store, path, &output),
        Commands::Import { file } => commands::transfer::import(&mut store, &file, &output),
        Commands::Sync => commands::sync::sync(store, &config, &output).await,
        Commands::Watch { interval } => {
            commands::sync::watch(store, &config, interval, &output).await
        }
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    if let Err(ref e) = result {
        print_recovery_hint(e, &output);
    }
    result
}

/// Point the user at a fix when a command failed on storage
fn print_recovery_hint(error: &anyhow::Error, output: &Output) {
    let storage = error.chain().find_map(|cause| {
        match cause.downcast_ref::<quotebook_core::Error>() {
            Some(quotebook_core::Error::Storage(e)) => Some(e),
            _ => cause.downcast_ref::<StorageError>(),
        }
    });

    if let Some(hint) = storage.and_then(StorageError::recovery_suggestion) {
        if !output.is_quiet() {
            eprintln!("Hint: {}", hint);
        }
    }
}

fn handle_filter_command(
    command: Option<FilterCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(FilterCommands::Show) | None => commands::category::show_filter(store, output),
        Some(FilterCommands::Set { value }) => {
            commands::category::set_filter(store, &value, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize tracing
///
/// `QUOTEBOOK_LOG` takes a full filter directive; otherwise both crates log
/// at `warn`, or `debug` with --verbose. Logs go to the configured log file,
/// falling back to stderr.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!("quotebook_core={},quotebook_cli={}", level, level))
    });

    let log_file = config.log_file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    // try_init so a second subscriber (tests) is not fatal
    match log_file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
