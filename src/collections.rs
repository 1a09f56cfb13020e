//! Every tracker collection, each behind its own persisted cell.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{
    dispatch_section, with_record, Appointment, Birthday, Book, Client, Entity, EntityList,
    EntityRecord, Event, Exercise, FoodItem, FoodLog, GroceryItem, Habit, Homework, Meal, Measurement, Movie,
    Note, NoteFolder, Project, Recipe, Section, SocialMediaPost, TodoTask, Transaction, TvShow,
    Workout,
};
use crate::storage::{keys, PersistedCell, SharedBackend, WriteStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

/// The live state of every tracker plus the small preference records.
///
/// Built once at startup and handed by reference to whatever needs it.
/// Each field is written only through its own cell.
#[derive(Debug)]
pub struct Collections {
    pub(crate) transactions: PersistedCell<EntityList<Transaction>>,
    pub(crate) tasks: PersistedCell<EntityList<TodoTask>>,
    pub(crate) groceries: PersistedCell<EntityList<GroceryItem>>,
    pub(crate) notes: PersistedCell<EntityList<Note>>,
    pub(crate) note_folders: PersistedCell<EntityList<NoteFolder>>,
    pub(crate) movies: PersistedCell<EntityList<Movie>>,
    pub(crate) tv_shows: PersistedCell<EntityList<TvShow>>,
    pub(crate) habits: PersistedCell<EntityList<Habit>>,
    pub(crate) books: PersistedCell<EntityList<Book>>,
    pub(crate) homework: PersistedCell<EntityList<Homework>>,
    pub(crate) projects: PersistedCell<EntityList<Project>>,
    pub(crate) meals: PersistedCell<EntityList<Meal>>,
    pub(crate) recipes: PersistedCell<EntityList<Recipe>>,
    pub(crate) food_logs: PersistedCell<EntityList<FoodLog>>,
    pub(crate) food_items: PersistedCell<EntityList<FoodItem>>,
    pub(crate) workouts: PersistedCell<EntityList<Workout>>,
    pub(crate) exercises: PersistedCell<EntityList<Exercise>>,
    pub(crate) measurements: PersistedCell<EntityList<Measurement>>,
    pub(crate) birthdays: PersistedCell<EntityList<Birthday>>,
    pub(crate) events: PersistedCell<EntityList<Event>>,
    pub(crate) clients: PersistedCell<EntityList<Client>>,
    pub(crate) appointments: PersistedCell<EntityList<Appointment>>,
    pub(crate) social_posts: PersistedCell<EntityList<SocialMediaPost>>,
    active_section: PersistedCell<Section>,
    theme: PersistedCell<ThemeName>,
}

impl Collections {
    pub fn load(backend: SharedBackend) -> Self {
        let b = || backend.clone();
        Self {
            transactions: PersistedCell::load(b(), keys::TRANSACTIONS, EntityList::default()),
            tasks: PersistedCell::load(b(), keys::TASKS, EntityList::default()),
            groceries: PersistedCell::load(b(), keys::GROCERIES, EntityList::default()),
            notes: PersistedCell::load(b(), keys::NOTES, EntityList::default()),
            note_folders: PersistedCell::load(b(), keys::NOTE_FOLDERS, EntityList::default()),
            movies: PersistedCell::load(b(), keys::MOVIES, EntityList::default()),
            tv_shows: PersistedCell::load(b(), keys::TV_SHOWS, EntityList::default()),
            habits: PersistedCell::load(b(), keys::HABITS, EntityList::default()),
            books: PersistedCell::load(b(), keys::BOOKS, EntityList::default()),
            homework: PersistedCell::load(b(), keys::HOMEWORK, EntityList::default()),
            projects: PersistedCell::load(b(), keys::PROJECTS, EntityList::default()),
            meals: PersistedCell::load(b(), keys::MEALS, EntityList::default()),
            recipes: PersistedCell::load(b(), keys::RECIPES, EntityList::default()),
            food_logs: PersistedCell::load(b(), keys::FOOD_LOGS, EntityList::default()),
            food_items: PersistedCell::load(b(), keys::FOOD_ITEMS, EntityList::default()),
            workouts: PersistedCell::load(b(), keys::WORKOUTS, EntityList::default()),
            exercises: PersistedCell::load(b(), keys::EXERCISES, EntityList::default()),
            measurements: PersistedCell::load(b(), keys::MEASUREMENTS, EntityList::default()),
            birthdays: PersistedCell::load(b(), keys::BIRTHDAYS, EntityList::default()),
            events: PersistedCell::load(b(), keys::EVENTS, EntityList::default()),
            clients: PersistedCell::load(b(), keys::CLIENTS, EntityList::default()),
            appointments: PersistedCell::load(b(), keys::APPOINTMENTS, EntityList::default()),
            social_posts: PersistedCell::load(b(), keys::SOCIAL_POSTS, EntityList::default()),
            active_section: PersistedCell::load(b(), keys::ACTIVE_SECTION, Section::default()),
            theme: PersistedCell::load(b(), keys::THEME, ThemeName::default()),
        }
    }

    pub fn get<T: Entity>(&self) -> &[T] {
        T::cell(self).get().items()
    }

    /// The stored collection including records that did not decode.
    pub fn list<T: Entity>(&self) -> &EntityList<T> {
        T::cell(self).get()
    }

    /// Replaces the decoded records. Undecodable stored records are kept.
    pub fn set<T: Entity>(&mut self, items: Vec<T>) -> WriteStatus {
        T::cell_mut(self).update(|list| list.with_items(items))
    }

    /// Replaces the whole stored collection, undecodable records included.
    pub fn replace_list<T: Entity>(&mut self, list: EntityList<T>) -> WriteStatus {
        T::cell_mut(self).set(list)
    }

    pub fn update<T, F>(&mut self, f: F) -> WriteStatus
    where
        T: Entity,
        F: FnOnce(&[T]) -> Vec<T>,
    {
        T::cell_mut(self).update(|list| list.with_items(f(list.items())))
    }

    /// Appends a record to its collection without re-sorting.
    pub fn insert(&mut self, record: EntityRecord) -> WriteStatus {
        with_record!(record, entity => self.push(entity))
    }

    pub fn push<T: Entity>(&mut self, entity: T) -> WriteStatus {
        self.update::<T, _>(|items| {
            let mut next = items.to_vec();
            next.push(entity);
            next
        })
    }

    pub fn find(&self, section: Section, id: &str) -> Option<EntityRecord> {
        dispatch_section!(section, T => self
            .get::<T>()
            .iter()
            .find(|entity| entity.id() == id)
            .cloned()
            .map(T::into_record))
    }

    /// Removes every entity of `section` whose id equals `id`.
    pub fn remove(&mut self, section: Section, id: &str) -> Option<EntityRecord> {
        let found = self.find(section, id)?;
        dispatch_section!(section, T => {
            self.update::<T, _>(|items| {
                items
                    .iter()
                    .filter(|entity| entity.id() != id)
                    .cloned()
                    .collect()
            });
        });
        Some(found)
    }

    pub fn len(&self, section: Section) -> usize {
        dispatch_section!(section, T => self.get::<T>().len())
    }

    pub fn records(&self, section: Section) -> Vec<EntityRecord> {
        dispatch_section!(section, T => self
            .get::<T>()
            .iter()
            .cloned()
            .map(T::into_record)
            .collect())
    }

    pub fn counts(&self) -> IndexMap<Section, usize> {
        Section::all()
            .map(|section| (section, self.len(section)))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts().values().sum()
    }

    pub fn notes_in_folder(&self, folder_id: &str) -> Vec<Note> {
        self.get::<Note>()
            .iter()
            .filter(|note| note.in_folder(folder_id))
            .cloned()
            .collect()
    }

    /// Drops purchased grocery items outright; they do not pass through trash.
    pub fn clear_purchased_groceries(&mut self) -> usize {
        let before = self.len(Section::Groceries);
        self.update::<GroceryItem, _>(|items| {
            items.iter().filter(|item| !item.purchased).cloned().collect()
        });
        let removed = before - self.len(Section::Groceries);
        tracing::info!(removed, "cleared purchased groceries");
        removed
    }

    pub fn active_section(&self) -> Section {
        *self.active_section.get()
    }

    pub fn set_active_section(&mut self, section: Section) -> WriteStatus {
        self.active_section.set(section)
    }

    pub fn theme(&self) -> ThemeName {
        *self.theme.get()
    }

    pub fn set_theme(&mut self, theme: ThemeName) -> WriteStatus {
        self.theme.set(theme)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryBackend, StorageBackend};

    fn task(id: &str, text: &str, created_at: i64) -> TodoTask {
        TodoTask {
            id: id.into(),
            text: text.into(),
            created_at,
            ..Default::default()
        }
    }

    #[test]
    fn empty_storage_loads_empty_collections() {
        let collections = Collections::load(Arc::new(MemoryBackend::new()));
        assert_eq!(collections.total(), 0);
        assert_eq!(collections.active_section(), Section::Budget);
        assert_eq!(collections.theme(), ThemeName::Light);
        assert_eq!(collections.counts().len(), Section::all().count());
    }

    #[test]
    fn insert_find_and_remove_dispatch_by_section() {
        let mut collections = Collections::load(Arc::new(MemoryBackend::new()));
        collections.insert(EntityRecord::Todo(task("1", "Buy milk", 100)));
        collections.insert(EntityRecord::Todo(task("2", "Call mom", 200)));

        assert_eq!(collections.len(Section::Todo), 2);
        assert_eq!(collections.len(Section::Budget), 0);
        assert!(collections.find(Section::Budget, "1").is_none());

        let removed = collections.remove(Section::Todo, "1");
        assert_eq!(removed, Some(EntityRecord::Todo(task("1", "Buy milk", 100))));
        assert_eq!(collections.get::<TodoTask>(), &[task("2", "Call mom", 200)]);
        assert!(collections.remove(Section::Todo, "missing").is_none());
    }

    #[test]
    fn collections_reload_from_the_same_backend() -> anyhow::Result<()> {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        {
            let mut collections = Collections::load(backend.clone());
            collections.push(task("1", "Persist me", 1));
            collections.set_active_section(Section::Todo);
        }
        let reloaded = Collections::load(backend.clone());
        assert_eq!(reloaded.get::<TodoTask>().len(), 1);
        assert_eq!(reloaded.active_section(), Section::Todo);
        assert!(backend.keys()?.contains(&keys::TASKS.to_string()));
        Ok(())
    }

    #[test]
    fn clear_purchased_groceries_keeps_unpurchased() {
        let mut collections = Collections::load(Arc::new(MemoryBackend::new()));
        for (id, purchased) in [("a", true), ("b", false), ("c", true)] {
            collections.push(GroceryItem {
                id: id.into(),
                name: id.into(),
                purchased,
                ..Default::default()
            });
        }
        assert_eq!(collections.clear_purchased_groceries(), 2);
        let left: Vec<_> = collections
            .get::<GroceryItem>()
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(left, vec!["b"]);
    }

    #[test]
    fn notes_in_folder_filters_by_folder_id() {
        let mut collections = Collections::load(Arc::new(MemoryBackend::new()));
        for (id, folder) in [("n1", Some("f")), ("n2", None), ("n3", Some("f"))] {
            collections.push(Note {
                id: id.into(),
                folder_id: folder.map(str::to_string),
                ..Default::default()
            });
        }
        let ids: Vec<_> = collections
            .notes_in_folder("f")
            .into_iter()
            .map(|note| note.id)
            .collect();
        assert_eq!(ids, vec!["n1", "n3"]);
    }

    #[test]
    fn loosely_typed_records_survive_load_and_write() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw(
            keys::MOVIES,
            r#"[{"id":"m1","title":"Alien"},{"id":"m2","title":"Brazil","notes":null,"createdAt":"1700"}]"#,
        );
        let mut collections = Collections::load(backend.clone());
        assert_eq!(collections.len(Section::Movies), 2);

        collections.push(Movie {
            id: "m3".into(),
            title: "Solaris".into(),
            ..Default::default()
        });
        let stored: serde_json::Value =
            serde_json::from_str(&backend.read(keys::MOVIES)?.unwrap_or_default())?;
        let ids: Vec<_> = stored
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|movie| movie["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(stored[1]["createdAt"], 1700);
        Ok(())
    }

    #[test]
    fn undecodable_records_are_not_overwritten() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw(
            keys::TASKS,
            r#"[{"id":"1","text":"Keep me"},{"id":"2","text":{"rich":"text"}},42]"#,
        );
        let mut collections = Collections::load(backend.clone());
        assert_eq!(collections.len(Section::Todo), 1);
        assert_eq!(collections.list::<TodoTask>().unreadable().len(), 2);

        collections.push(task("3", "New", 3));
        collections.remove(Section::Todo, "1");
        let stored: serde_json::Value =
            serde_json::from_str(&backend.read(keys::TASKS)?.unwrap_or_default())?;
        assert_eq!(
            stored,
            serde_json::json!([
                {"id": "3", "text": "New", "completed": false, "createdAt": 3},
                {"id": "2", "text": {"rich": "text"}},
                42
            ])
        );

        let reloaded = Collections::load(backend);
        assert_eq!(reloaded.get::<TodoTask>(), &[task("3", "New", 3)]);
        assert_eq!(reloaded.list::<TodoTask>().unreadable().len(), 2);
        Ok(())
    }
}
