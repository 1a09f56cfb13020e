//! Whole-store snapshots.
//!
//! A backup is one JSON document with every collection, the trash, and the
//! active section. Importing replaces each of them wholesale; nothing is
//! merged. Fields missing from an older or newer document fall back to their
//! empty defaults.

use std::cmp::Reverse;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::collections::Collections;
use crate::confirm::{Confirm, Decision};
use crate::model::{
    Appointment, Birthday, Book, Client, EntityList, Event, Exercise, FoodItem, FoodLog,
    GroceryItem, Habit, Homework, Meal, Measurement, Movie, Note, NoteFolder, Project, Recipe, Section,
    SocialMediaPost, TodoTask, Transaction, TvShow, Workout,
};
use crate::trash::{TrashItem, TrashManager};

pub const APP_NAME: &str = "Personal Organizer";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const FILE_PREFIX: &str = "organizer-backup-";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("backup belongs to {found:?}, expected \"Personal Organizer\"")]
    WrongApp { found: String },
    #[error("backup file I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Every collection is an [`EntityList`], so a record that does not decode
/// travels through import and export unchanged instead of failing the file.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupDocument {
    pub transactions: EntityList<Transaction>,
    pub tasks: EntityList<TodoTask>,
    pub groceries: EntityList<GroceryItem>,
    pub notes: EntityList<Note>,
    pub note_folders: EntityList<NoteFolder>,
    pub movies: EntityList<Movie>,
    pub tv_shows: EntityList<TvShow>,
    pub habits: EntityList<Habit>,
    pub books: EntityList<Book>,
    pub homework: EntityList<Homework>,
    pub projects: EntityList<Project>,
    pub meals: EntityList<Meal>,
    pub recipes: EntityList<Recipe>,
    pub food_logs: EntityList<FoodLog>,
    pub food_items: EntityList<FoodItem>,
    pub workouts: EntityList<Workout>,
    pub exercises: EntityList<Exercise>,
    pub measurements: EntityList<Measurement>,
    pub birthdays: EntityList<Birthday>,
    pub events: EntityList<Event>,
    pub clients: EntityList<Client>,
    pub appointments: EntityList<Appointment>,
    pub social_posts: EntityList<SocialMediaPost>,
    pub trash: EntityList<TrashItem>,
    #[serde_as(as = "DefaultOnError")]
    pub active_section: Section,
    #[serde_as(as = "DefaultOnNull")]
    pub backup_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub app_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub counts: IndexMap<Section, usize>,
    pub trash: usize,
    pub from_version: String,
    pub version_mismatch: bool,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

pub fn export_all(collections: &Collections, trash: &TrashManager, clock: &dyn Clock) -> BackupDocument {
    let backup_date = clock
        .now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| clock.now_millis().to_string());
    let document = BackupDocument {
        transactions: collections.list::<Transaction>().clone(),
        tasks: collections.list::<TodoTask>().clone(),
        groceries: collections.list::<GroceryItem>().clone(),
        notes: collections.list::<Note>().clone(),
        note_folders: collections.list::<NoteFolder>().clone(),
        movies: collections.list::<Movie>().clone(),
        tv_shows: collections.list::<TvShow>().clone(),
        habits: collections.list::<Habit>().clone(),
        books: collections.list::<Book>().clone(),
        homework: collections.list::<Homework>().clone(),
        projects: collections.list::<Project>().clone(),
        meals: collections.list::<Meal>().clone(),
        recipes: collections.list::<Recipe>().clone(),
        food_logs: collections.list::<FoodLog>().clone(),
        food_items: collections.list::<FoodItem>().clone(),
        workouts: collections.list::<Workout>().clone(),
        exercises: collections.list::<Exercise>().clone(),
        measurements: collections.list::<Measurement>().clone(),
        birthdays: collections.list::<Birthday>().clone(),
        events: collections.list::<Event>().clone(),
        clients: collections.list::<Client>().clone(),
        appointments: collections.list::<Appointment>().clone(),
        social_posts: collections.list::<SocialMediaPost>().clone(),
        trash: trash.list().clone(),
        active_section: collections.active_section(),
        backup_date,
        app_name: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
    };
    tracing::info!(entities = collections.total(), trash = trash.len(), "backup exported");
    document
}

/// Parses and validates a backup document without touching any state.
pub fn parse_backup(raw: &str) -> Result<BackupDocument, BackupError> {
    let document: BackupDocument = serde_json::from_str(raw)?;
    if document.app_name != APP_NAME {
        return Err(BackupError::WrongApp {
            found: document.app_name,
        });
    }
    Ok(document)
}

/// Replaces every collection, the trash, and the active section with the
/// contents of `document`. A document from another version asks first.
pub fn import_all<C>(
    collections: &mut Collections,
    trash: &mut TrashManager,
    document: BackupDocument,
    confirm: &C,
) -> Decision<ImportReport>
where
    C: Confirm + ?Sized,
{
    let version_mismatch = document.version != APP_VERSION;
    if version_mismatch {
        let prompt = format!(
            "This backup is from version {} but you are running {APP_VERSION}. Restore it anyway?",
            display_version(&document.version)
        );
        if !confirm.confirm(&prompt) {
            tracing::info!(version = %document.version, "backup import declined");
            return Decision::Declined;
        }
    }

    let from_version = document.version.clone();
    let trash_count = document.trash.items().len();

    collections.replace_list(document.transactions);
    collections.replace_list(document.tasks);
    collections.replace_list(document.groceries);
    collections.replace_list(document.notes);
    collections.replace_list(document.note_folders);
    collections.replace_list(document.movies);
    collections.replace_list(document.tv_shows);
    collections.replace_list(document.habits);
    collections.replace_list(document.books);
    collections.replace_list(document.homework);
    collections.replace_list(document.projects);
    collections.replace_list(document.meals);
    collections.replace_list(document.recipes);
    collections.replace_list(document.food_logs);
    collections.replace_list(document.food_items);
    collections.replace_list(document.workouts);
    collections.replace_list(document.exercises);
    collections.replace_list(document.measurements);
    collections.replace_list(document.birthdays);
    collections.replace_list(document.events);
    collections.replace_list(document.clients);
    collections.replace_list(document.appointments);
    collections.replace_list(document.social_posts);
    trash.replace_all(document.trash);
    collections.set_active_section(document.active_section);

    let report = ImportReport {
        counts: collections.counts(),
        trash: trash_count,
        from_version,
        version_mismatch,
    };
    tracing::info!(
        entities = report.total(),
        trash = report.trash,
        version = %report.from_version,
        "backup imported"
    );
    Decision::Proceeded(report)
}

fn display_version(version: &str) -> &str {
    if version.trim().is_empty() {
        "unknown"
    } else {
        version
    }
}

pub fn backup_file_name(at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("{FILE_PREFIX}{stamp}.json")
}

/// Writes `document` into `dir` through a temporary file and a rename.
/// An existing file with the same timestamp gets a `-N` suffix.
pub fn write_backup_file(
    dir: &Path,
    document: &BackupDocument,
    at: OffsetDateTime,
    pretty: bool,
) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(dir)?;
    let encoded = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };

    let mut path = dir.join(backup_file_name(at));
    let mut attempt = 1;
    while path.exists() {
        let name = backup_file_name(at);
        let stem = name.trim_end_matches(".json");
        path = dir.join(format!("{stem}-{attempt}.json"));
        attempt += 1;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, encoded)?;
    if let Err(err) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    tracing::info!(path = %path.display(), "backup written");
    Ok(path)
}

pub fn read_backup_file(path: &Path) -> Result<BackupDocument, BackupError> {
    let raw = fs::read_to_string(path)?;
    parse_backup(&raw)
}

/// Backup files under `dir`, newest name first.
pub fn list_backup_files(dir: &Path) -> Result<Vec<PathBuf>, BackupError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(".json"))
            .unwrap_or(false);
        if is_backup {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|path| Reverse(backup_order_key(path)));
    Ok(files)
}

/// Timestamp part of a backup file name plus its collision suffix.
fn backup_order_key(path: &Path) -> (String, u32) {
    let stem = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(FILE_PREFIX))
        .and_then(|name| name.strip_suffix(".json"))
        .unwrap_or_default();
    match stem.rsplit_once('-') {
        Some((stamp, suffix)) if stamp.contains('-') => match suffix.parse() {
            Ok(n) => (stamp.to_string(), n),
            Err(_) => (stem.to_string(), 0),
        },
        _ => (stem.to_string(), 0),
    }
}
