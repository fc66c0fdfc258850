//! restbind CLI
//!
//! Drives a REST binding from the terminal.
//!
//! # Commands
//!
//! - `list` - Search the resource and print a page of rows
//! - `show` - Print one item
//! - `create` - Create an item from `--set path=value` assignments
//! - `update` - Change an item with `--set path=value` assignments
//! - `delete` - Delete an item

mod commands;
mod config;
mod console;
mod error;
mod transport;

use clap::{Parser, Subcommand};
use config::CliConfig;
use console::{ConsoleEngine, ConsoleForm, ConsoleListing};
use restbind_engine::SyncEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use transport::ReqwestTransport;

/// Command-line client for a REST binding.
#[derive(Parser)]
#[command(name = "restbind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the binding file
    #[arg(global = true, short, long, default_value = "binding.json")]
    config: PathBuf,

    /// Base URL for relative endpoints, overriding the binding file
    #[arg(global = true, long)]
    base_url: Option<String>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(global = true, long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the resource and print a page of rows
    List {
        /// Search term
        #[arg(short, long)]
        search: Option<String>,

        /// Page to show, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u64,
    },

    /// Print one item
    Show {
        /// Item identity
        id: String,
    },

    /// Create an item
    Create {
        /// Field assignment as path=value (repeatable)
        #[arg(long = "set", value_name = "PATH=VALUE")]
        assignments: Vec<String>,
    },

    /// Change an item
    Update {
        /// Item identity
        id: String,

        /// Field assignment as path=value (repeatable)
        #[arg(long = "set", value_name = "PATH=VALUE")]
        assignments: Vec<String>,
    },

    /// Delete an item
    Delete {
        /// Item identity
        id: String,
    },
}

fn build_engine(cli: &Cli) -> Result<ConsoleEngine<ReqwestTransport>, error::CliError> {
    let mut config = CliConfig::load(&cli.config)?;
    for header in &cli.headers {
        config = config.with_header_arg(header)?;
    }
    let base_url = cli.base_url.clone().or_else(|| config.base_url.clone());
    let transport = ReqwestTransport::new(base_url, config.timeout())?;
    let listing = ConsoleListing::new(config.binding.columns.clone());
    let form = ConsoleForm::new(config.controls());
    Ok(SyncEngine::new(config.binding, transport, listing, form)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = build_engine(&cli)?;
    let output = match &cli.command {
        Commands::List { search, page } => {
            commands::list::run(&engine, search.as_deref(), *page).await?
        }
        Commands::Show { id } => commands::show::run(&engine, id).await?,
        Commands::Create { assignments } => commands::create::run(&engine, assignments).await?,
        Commands::Update { id, assignments } => {
            commands::update::run(&engine, id, assignments).await?
        }
        Commands::Delete { id } => commands::delete::run(&engine, id).await?,
    };
    print!("{output}");

    Ok(())
}
