use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use regex::Regex;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::app::{App, DeleteOutcome};
use crate::backup::{self, ImportReport};
use crate::confirm::{Confirm, Decision};
use crate::model::{EntityRecord, Section};
use crate::search::{highlight_regex, SearchResult};
use crate::storage::{BackupRecord, StorageHandle, WalCheckpointStats};
use crate::trash::{RestoreOutcome, TrashItem};

pub fn parse_section(raw: &str) -> Result<Section, String> {
    Section::parse_loose(raw).ok_or_else(|| {
        let known = Section::all()
            .map(Section::tag)
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown section '{raw}' (expected one of: {known})")
    })
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Section to print, e.g. TODO, tv-shows, Recipes
    #[arg(value_parser = parse_section)]
    pub section: Section,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(value_parser = parse_section)]
    pub section: Section,
    /// Entity as a JSON object. If omitted, reads from stdin.
    pub json: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_section)]
    pub section: Section,
    /// Entity identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search text, matched case-insensitively as a substring
    #[arg()]
    pub query: Vec<String>,
    /// Limit the number of results printed (defaults to search.max_results)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TrashCommand {
    /// List trashed items with their remaining retention
    List,
    /// Put an item back into its collection
    Restore { trash_id: String },
    /// Restore every item, oldest deletion first
    RestoreAll,
    /// Permanently delete one item
    Purge { trash_id: String },
    /// Permanently delete everything in trash
    Empty,
    /// Drop items past the retention window now
    Sweep,
}

#[derive(Args, Debug, Clone)]
pub struct TrashArgs {
    #[command(subcommand)]
    pub command: TrashCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommand {
    /// Write a backup file (defaults to the configured backup directory)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all data with the contents of a backup file
    Import { file: PathBuf },
    /// Show recent backups
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PinCommand {
    /// Require a four-digit PIN at startup
    Set { pin: String },
    /// Remove the PIN
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct PinArgs {
    #[command(subcommand)]
    pub command: PinCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroceriesCommand {
    /// Remove purchased items without sending them to trash
    ClearPurchased,
}

#[derive(Args, Debug, Clone)]
pub struct GroceriesArgs {
    #[command(subcommand)]
    pub command: GroceriesCommand,
}

/// Asks on stderr and reads the answer from stdin. Declines when stdin is
/// not a terminal.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            tracing::warn!(prompt = message, "cannot ask for confirmation without a terminal, pass --yes");
            return false;
        }
        match prompt(&format!("{message} [y/N]")) {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                tracing::warn!(error = %err, "reading confirmation failed");
                false
            }
        }
    }
}

pub fn status(app: &App, storage: &StorageHandle) -> Result<()> {
    let wal = match storage.run_wal_health_check() {
        Ok(stats) => Some(stats),
        Err(err) => {
            tracing::warn!(error = %err, "WAL health check failed");
            None
        }
    };
    print!("{}", format_status(app, wal.as_ref()));
    Ok(())
}

pub fn list(app: &App, args: ListArgs) -> Result<()> {
    let records = app.collections().records(args.section);
    let json = serde_json::to_string_pretty(&records).context("encoding collection")?;
    println!("{json}");
    Ok(())
}

pub fn add(app: &mut App, args: AddArgs) -> Result<()> {
    let raw = match args.json {
        Some(json) => json,
        None => match read_stdin()? {
            Some(json) => json,
            None => prompt("JSON")?,
        },
    };
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).context("parsing entity JSON")?;
    if !value.is_object() {
        bail!("entity must be a JSON object");
    }
    let record = EntityRecord::from_value(args.section, value)
        .with_context(|| format!("entity does not match section {}", args.section))?;
    let added = app.add(record);
    println!(
        "Added {} '{}' ({})",
        added.section().label(),
        added.display_name(),
        added.id()
    );
    Ok(())
}

pub fn delete(app: &mut App, args: DeleteArgs, confirm: &dyn Confirm) -> Result<()> {
    let decision = app
        .delete(args.section, &args.id, confirm)
        .with_context(|| format!("deleting {} {}", args.section, args.id))?;
    match decision {
        Decision::Declined => println!("Cancelled; nothing was deleted."),
        Decision::Proceeded(DeleteOutcome::Trashed { trash_id }) => {
            println!("Moved to trash as {trash_id}");
        }
        Decision::Proceeded(DeleteOutcome::Folder(deletion)) => {
            println!(
                "Moved folder to trash as {} along with {} note{}",
                deletion.folder_trash_id,
                deletion.note_trash_ids.len(),
                plural(deletion.note_trash_ids.len())
            );
        }
    }
    Ok(())
}

pub fn handle_trash_command(app: &mut App, args: TrashArgs, confirm: &dyn Confirm) -> Result<()> {
    match args.command {
        TrashCommand::List => print!("{}", format_trash(app)),
        TrashCommand::Restore { trash_id } => {
            let outcome = app
                .restore(&trash_id)
                .with_context(|| format!("restoring {trash_id}"))?;
            println!("{}", describe_restore(&outcome));
        }
        TrashCommand::RestoreAll => {
            let outcomes = app.restore_all().context("restoring trash")?;
            if outcomes.is_empty() {
                println!("Trash is empty.");
            }
            for outcome in &outcomes {
                println!("{}", describe_restore(outcome));
            }
        }
        TrashCommand::Purge { trash_id } => {
            match app
                .purge(&trash_id, confirm)
                .with_context(|| format!("purging {trash_id}"))?
            {
                Decision::Proceeded(item) => {
                    println!("Permanently deleted '{}'", item.display_name())
                }
                Decision::Declined => println!("Cancelled; trash unchanged."),
            }
        }
        TrashCommand::Empty => match app.empty_trash(confirm) {
            Decision::Proceeded(0) => println!("Trash is already empty."),
            Decision::Proceeded(count) => {
                println!("Permanently deleted {count} item{}", plural(count))
            }
            Decision::Declined => println!("Cancelled; trash unchanged."),
        },
        TrashCommand::Sweep => {
            let removed = app.sweep_trash();
            println!("Removed {removed} expired item{}", plural(removed));
        }
    }
    Ok(())
}

pub fn search(app: &App, args: SearchArgs) -> Result<()> {
    let output = run_search(app, &args)?;
    print!("{output}");
    Ok(())
}

fn run_search(app: &App, args: &SearchArgs) -> Result<String> {
    let query = args.query.join(" ");
    let trimmed = query.trim();
    if trimmed.is_empty() {
        bail!("search query cannot be empty");
    }
    let results = match args.limit {
        Some(limit) => app.search_limited(trimmed, limit),
        None => app.search(trimmed),
    };
    let highlight = highlight_regex(&[trimmed]);
    Ok(format_search_results(&results, highlight.as_ref()))
}

pub fn handle_backup_command(
    app: &mut App,
    storage: &StorageHandle,
    args: BackupArgs,
    confirm: &dyn Confirm,
) -> Result<()> {
    match args.command {
        BackupCommand::Export { out } => {
            let dir = out.unwrap_or_else(|| app.config.storage.backup_dir.clone());
            let document = app.export_backup();
            let path =
                backup::write_backup_file(&dir, &document, app.now_utc(), app.config.backup.pretty)
                    .with_context(|| format!("writing backup into {}", dir.display()))?;
            if let Err(err) = storage.record_backup(&path) {
                tracing::warn!(error = %err, "recording backup history failed");
            }
            println!("Backup written to {}", path.display());
        }
        BackupCommand::Import { file } => {
            let document = backup::read_backup_file(&file)
                .with_context(|| format!("reading backup {}", file.display()))?;
            match app.import_backup(document, confirm) {
                Decision::Proceeded(report) => print!("{}", format_import_report(&report)),
                Decision::Declined => println!("Import cancelled; current data kept."),
            }
        }
        BackupCommand::List { limit } => {
            let history = storage
                .list_backups(limit)
                .context("listing backup history")?;
            let dir = &app.config.storage.backup_dir;
            let files = backup::list_backup_files(dir)
                .with_context(|| format!("scanning {}", dir.display()))?;
            print!("{}", format_backup_history(&history, &files));
        }
    }
    Ok(())
}

pub fn handle_pin_command(app: &mut App, args: PinArgs) -> Result<()> {
    match args.command {
        PinCommand::Set { pin } => {
            app.set_pin(pin.trim())?;
            println!("PIN set; the organizer will be locked at next start.");
        }
        PinCommand::Clear => {
            app.clear_pin();
            println!("PIN removed.");
        }
    }
    Ok(())
}

pub fn handle_groceries_command(app: &mut App, args: GroceriesArgs) -> Result<()> {
    match args.command {
        GroceriesCommand::ClearPurchased => {
            let removed = app.clear_purchased_groceries();
            println!("Removed {removed} purchased item{}", plural(removed));
        }
    }
    Ok(())
}

pub(crate) fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", label)?;
    stderr.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn format_status(app: &App, wal: Option<&WalCheckpointStats>) -> String {
    let mut out = String::new();
    let counts = app.collections().counts();
    let width = counts
        .keys()
        .map(|section| section.label().len())
        .max()
        .unwrap_or(0);
    for (section, count) in &counts {
        let _ = writeln!(&mut out, "{:<width$}  {count}", section.label());
    }
    let _ = writeln!(&mut out);
    let _ = writeln!(&mut out, "Trash: {} item{}", app.trash().len(), plural(app.trash().len()));
    let lock = if app.has_pin() { "PIN set" } else { "no PIN" };
    let _ = writeln!(&mut out, "Lock:  {lock}");
    if let Some(stats) = wal {
        let _ = writeln!(
            &mut out,
            "WAL:   {} frames, {} checkpointed",
            stats.wal_frames, stats.checkpointed_frames
        );
    }
    out
}

fn format_trash(app: &App) -> String {
    let items = app.trash().items();
    if items.is_empty() {
        return "Trash is empty.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(&mut out, "{}", format_trash_line(item, &app.expiry_status(item).label));
    }
    out
}

fn format_trash_line(item: &TrashItem, expiry: &str) -> String {
    let mut line = format!(
        "{}  [{}] {}  deleted {}  ({expiry})",
        item.id,
        item.section_tag(),
        item.display_name(),
        format_timestamp(item.deleted_at)
    );
    if !item.is_recognized() {
        line.push_str("  [UNRECOGNIZED]");
    } else if !item.is_readable() {
        line.push_str("  [UNREADABLE]");
    }
    line
}

fn describe_restore(outcome: &RestoreOutcome) -> String {
    match outcome {
        RestoreOutcome::Restored { section, entity_id } => {
            format!("Restored {entity_id} to {}", section.label())
        }
        RestoreOutcome::Dropped { section } => {
            format!("Dropped item from unrecognized section {section}; nothing was restored")
        }
        RestoreOutcome::Kept { trash_id, section } => {
            format!("Kept {trash_id} in trash: its {} data cannot be read", section.label())
        }
    }
}

fn format_search_results(results: &[SearchResult], highlight: Option<&Regex>) -> String {
    if results.is_empty() {
        return "No matches found.\n".to_string();
    }
    let mark = |text: &str| match highlight {
        Some(regex) => regex.replace_all(text, "[$0]").into_owned(),
        None => text.to_string(),
    };
    let mut out = String::new();
    for result in results {
        let _ = writeln!(
            &mut out,
            "{}  {}  ({})",
            result.section.label(),
            mark(&result.title),
            result.original_id
        );
        if !result.context.is_empty() {
            let _ = writeln!(&mut out, "    {}", mark(&result.context));
        }
    }
    out
}

fn format_import_report(report: &ImportReport) -> String {
    let mut out = String::new();
    if report.version_mismatch {
        let _ = writeln!(
            &mut out,
            "Imported a backup from version {} (running {}).",
            report.from_version,
            backup::APP_VERSION
        );
    }
    let _ = writeln!(
        &mut out,
        "Restored {} entr{} and {} trash item{}.",
        report.total(),
        if report.total() == 1 { "y" } else { "ies" },
        report.trash,
        plural(report.trash)
    );
    for (section, count) in report.counts.iter().filter(|(_, count)| **count > 0) {
        let _ = writeln!(&mut out, "  {}: {count}", section.label());
    }
    out
}

fn format_backup_history(history: &[BackupRecord], files: &[PathBuf]) -> String {
    let mut out = String::new();
    if history.is_empty() {
        let _ = writeln!(&mut out, "No backups recorded yet.");
    }
    for record in history {
        let _ = writeln!(
            &mut out,
            "{}  {}",
            format_timestamp(record.created_at),
            record.path.display()
        );
    }
    let untracked: Vec<&PathBuf> = files
        .iter()
        .filter(|file| !history.iter().any(|record| &record.path == *file))
        .collect();
    if !untracked.is_empty() {
        let _ = writeln!(&mut out, "\nOther backup files:");
        for file in untracked {
            let _ = writeln!(&mut out, "  {}", file.display());
        }
    }
    out
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map(|dt| dt.format(&Rfc3339).unwrap_or_else(|_| millis.to_string()))
        .unwrap_or_else(|_| millis.to_string())
}
