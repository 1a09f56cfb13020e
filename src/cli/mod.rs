use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::clock::SystemClock;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::confirm::{AssumeYes, Confirm};
use crate::storage;

pub mod commands;

use self::commands::{
    AddArgs, BackupArgs, DeleteArgs, GroceriesArgs, ListArgs, PinArgs, SearchArgs, StdinConfirm,
    TrashArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "organizer",
    version,
    about = "Personal organizer: trackers, trash, search and backups"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over ORGANIZER_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over ORGANIZER_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// PIN to unlock with instead of prompting
    #[arg(long, global = true)]
    pub pin: Option<String>,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show entity counts per section (default)
    Status,
    /// Print a section as JSON
    List(ListArgs),
    /// Add an entity from JSON
    Add(AddArgs),
    /// Move an entity to trash
    Delete(DeleteArgs),
    /// Inspect and manage deleted items
    Trash(TrashArgs),
    /// Search across all trackers
    Search(SearchArgs),
    /// Export, import and list backups
    Backup(BackupArgs),
    /// Manage the startup PIN
    Pin(PinArgs),
    /// Grocery list maintenance
    Groceries(GroceriesArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;

    let config = Arc::new(config);
    let mut app = App::open(config, Arc::new(storage.clone()), Arc::new(SystemClock));
    unlock(&mut app, cli.pin.as_deref())?;

    let confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };
    let confirm = confirm.as_ref();

    let command = cli.command.unwrap_or(Commands::Status);
    match command {
        Commands::Status => commands::status(&app, &storage),
        Commands::List(args) => commands::list(&app, args),
        Commands::Add(args) => commands::add(&mut app, args),
        Commands::Delete(args) => commands::delete(&mut app, args, confirm),
        Commands::Trash(args) => commands::handle_trash_command(&mut app, args, confirm),
        Commands::Search(args) => commands::search(&app, args),
        Commands::Backup(args) => {
            commands::handle_backup_command(&mut app, &storage, args, confirm)
        }
        Commands::Pin(args) => commands::handle_pin_command(&mut app, args),
        Commands::Groceries(args) => commands::handle_groceries_command(&mut app, args),
    }
}

fn unlock(app: &mut App, pin: Option<&str>) -> Result<()> {
    if !app.is_locked() {
        return Ok(());
    }
    let attempt = match pin {
        Some(pin) => pin.to_string(),
        None if atty::is(atty::Stream::Stdin) => commands::prompt("PIN")?,
        None => bail!("organizer is locked; pass --pin"),
    };
    if !app.unlock(attempt.trim()) {
        bail!("incorrect PIN");
    }
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
