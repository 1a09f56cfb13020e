//! Domain records and the section tags that route them.
//!
//! Every tracker collection holds one entity type. [`Section`] names the
//! collection an entity lives in; four pseudo-sections cover records nested
//! under another tracker (note folders, recipes, food items, exercises).
//! [`EntityRecord`] is the section-tagged union of every entity type and is
//! what trash and insert/remove dispatch on.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use uuid::Uuid;

use crate::collections::Collections;
use crate::storage::PersistedCell;

mod macros;

mod finance;
mod health;
mod list;
mod media;
mod notes;
mod people;
mod record;
mod tasks;

pub use finance::{Transaction, TransactionKind};
pub use health::{Exercise, FoodItem, FoodLog, Meal, Measurement, Recipe, Workout};
pub use list::EntityList;
pub use media::{Book, Movie, TvShow};
pub use notes::{Note, NoteFolder};
pub use people::{Appointment, Birthday, Client, Event, SocialMediaPost};
pub use record::EntityRecord;
pub use tasks::{GroceryItem, Habit, Homework, Project, TodoTask};

pub(crate) use macros::{dispatch_section, impl_entity, with_record};

/// Unknown JSON fields kept alongside the typed ones.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum Section {
    #[serde(rename = "BUDGET")]
    #[strum(serialize = "BUDGET")]
    Budget,
    #[serde(rename = "TODO")]
    #[strum(serialize = "TODO")]
    Todo,
    #[serde(rename = "GROCERIES")]
    #[strum(serialize = "GROCERIES")]
    Groceries,
    #[serde(rename = "NOTES")]
    #[strum(serialize = "NOTES")]
    Notes,
    #[serde(rename = "NoteFolders")]
    #[strum(serialize = "NoteFolders")]
    NoteFolders,
    #[serde(rename = "MOVIES")]
    #[strum(serialize = "MOVIES")]
    Movies,
    #[serde(rename = "TV_SHOWS")]
    #[strum(serialize = "TV_SHOWS")]
    TvShows,
    #[serde(rename = "HABITS")]
    #[strum(serialize = "HABITS")]
    Habits,
    #[serde(rename = "BOOKS")]
    #[strum(serialize = "BOOKS")]
    Books,
    #[serde(rename = "HOMEWORK")]
    #[strum(serialize = "HOMEWORK")]
    Homework,
    #[serde(rename = "PROJECTS")]
    #[strum(serialize = "PROJECTS")]
    Projects,
    #[serde(rename = "MEAL_PLANNER")]
    #[strum(serialize = "MEAL_PLANNER")]
    MealPlanner,
    #[serde(rename = "Recipes")]
    #[strum(serialize = "Recipes")]
    Recipes,
    #[serde(rename = "FOOD_LOG")]
    #[strum(serialize = "FOOD_LOG")]
    FoodLog,
    #[serde(rename = "FoodItems")]
    #[strum(serialize = "FoodItems")]
    FoodItems,
    #[serde(rename = "WORKOUTS")]
    #[strum(serialize = "WORKOUTS")]
    Workouts,
    #[serde(rename = "Exercises")]
    #[strum(serialize = "Exercises")]
    Exercises,
    #[serde(rename = "MEASUREMENTS")]
    #[strum(serialize = "MEASUREMENTS")]
    Measurements,
    #[serde(rename = "BIRTHDAYS")]
    #[strum(serialize = "BIRTHDAYS")]
    Birthdays,
    #[serde(rename = "EVENTS")]
    #[strum(serialize = "EVENTS")]
    Events,
    #[serde(rename = "CLIENTS")]
    #[strum(serialize = "CLIENTS")]
    Clients,
    #[serde(rename = "APPOINTMENTS")]
    #[strum(serialize = "APPOINTMENTS")]
    Appointments,
    #[serde(rename = "SOCIAL_MEDIA")]
    #[strum(serialize = "SOCIAL_MEDIA")]
    SocialMedia,
}

impl Default for Section {
    fn default() -> Self {
        Section::Budget
    }
}

impl Section {
    /// The stored tag, e.g. `TODO` or `NoteFolders`.
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn all() -> impl Iterator<Item = Section> {
        Section::iter()
    }

    /// Nested records without a tracker of their own.
    pub fn is_pseudo(self) -> bool {
        matches!(
            self,
            Section::NoteFolders | Section::Recipes | Section::FoodItems | Section::Exercises
        )
    }

    /// The tracker a user navigates to for records of this section.
    pub fn nav_section(self) -> Section {
        match self {
            Section::NoteFolders => Section::Notes,
            Section::Recipes => Section::MealPlanner,
            Section::FoodItems => Section::FoodLog,
            Section::Exercises => Section::Workouts,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Budget => "Budget",
            Section::Todo => "To-Do",
            Section::Groceries => "Groceries",
            Section::Notes => "Notes",
            Section::NoteFolders => "Note folders",
            Section::Movies => "Movies",
            Section::TvShows => "TV shows",
            Section::Habits => "Habits",
            Section::Books => "Books",
            Section::Homework => "Homework",
            Section::Projects => "Projects",
            Section::MealPlanner => "Meal planner",
            Section::Recipes => "Recipes",
            Section::FoodLog => "Food log",
            Section::FoodItems => "Food items",
            Section::Workouts => "Workouts",
            Section::Exercises => "Exercises",
            Section::Measurements => "Measurements",
            Section::Birthdays => "Birthdays",
            Section::Events => "Events",
            Section::Clients => "Clients",
            Section::Appointments => "Appointments",
            Section::SocialMedia => "Social media",
        }
    }

    /// Parses a stored tag exactly, falling back to a loose match that
    /// ignores case, `-` and `_` (`tv-shows`, `notefolders`, `todo`).
    pub fn parse_loose(input: &str) -> Option<Section> {
        if let Ok(section) = Section::from_str(input) {
            return Some(section);
        }
        let wanted = squash(input);
        Section::iter().find(|section| squash(section.tag()) == wanted)
    }
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, '-' | '_' | ' '))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// A record owned by exactly one collection.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Sized + 'static
{
    const SECTION: Section;

    fn id(&self) -> &str;

    /// Fills in an id and creation time for a freshly created record.
    fn stamp_new(&mut self, now_millis: i64);

    /// Puts a collection back into its canonical order. Stable.
    fn sort_canonical(_items: &mut [Self]) {}

    fn into_record(self) -> EntityRecord;

    fn cell(collections: &Collections) -> &PersistedCell<EntityList<Self>>;

    fn cell_mut(collections: &mut Collections) -> &mut PersistedCell<EntityList<Self>>;
}

/// Time-based id with a random suffix, e.g. `1718000000000-3f9c2a1b`.
pub fn new_entity_id(now_millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{now_millis}-{}", &suffix[..8])
}

pub(crate) fn cmp_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
