//! Soft delete.
//!
//! Deleting an entity moves it out of its collection and into a single trash
//! sequence, newest first. From there it is either restored to its collection
//! (re-sorted into that collection's canonical order) or destroyed, by an
//! explicit purge or by the startup expiry sweep.

use std::sync::Arc;

use thiserror::Error;

use crate::clock::Clock;
use crate::collections::Collections;
use crate::config::TrashOptions;
use crate::confirm::{Confirm, Decision};
use crate::model::{with_record, Entity, EntityList, EntityRecord, Section};
use crate::storage::{keys, PersistedCell, SharedBackend};

mod expiry;
mod item;

pub use expiry::ExpiryStatus;
pub use item::{TrashItem, TrashPayload};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrashError {
    #[error("no {section} entry with id {id}")]
    NotFound { section: Section, id: String },
    #[error("trash item {0} not found")]
    NotInTrash(String),
    #[error("trash item {trash_id} comes from unrecognized section {section}")]
    UnknownSection { trash_id: String, section: String },
    #[error("trash item {trash_id} holds {section} data that cannot be read")]
    UnreadableData { trash_id: String, section: Section },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { section: Section, entity_id: String },
    /// The item was removed from trash without being re-inserted anywhere.
    Dropped { section: String },
    /// `restore_all` left an item with unreadable data in trash.
    Kept { trash_id: String, section: Section },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDeletion {
    pub folder_trash_id: String,
    pub note_trash_ids: Vec<String>,
}

pub struct TrashManager {
    items: PersistedCell<EntityList<TrashItem>>,
    retention_millis: Option<i64>,
    strict_restore: bool,
    clock: Arc<dyn Clock>,
    last_stamp: i64,
}

impl TrashManager {
    pub fn load(backend: SharedBackend, options: &TrashOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: PersistedCell::load(backend, keys::TRASH, EntityList::default()),
            retention_millis: options.retention_millis(),
            strict_restore: options.strict_restore,
            clock,
            last_stamp: 0,
        }
    }

    pub fn items(&self) -> &[TrashItem] {
        self.items.get().items()
    }

    /// The stored trash including entries that did not decode.
    pub fn list(&self) -> &EntityList<TrashItem> {
        self.items.get()
    }

    pub fn get(&self, trash_id: &str) -> Option<&TrashItem> {
        self.items().iter().find(|item| item.id == trash_id)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn retention_millis(&self) -> Option<i64> {
        self.retention_millis
    }

    /// Moves `record` into trash and removes it from its collection.
    ///
    /// Returns the new trash id.
    pub fn move_to_trash(&mut self, collections: &mut Collections, record: EntityRecord) -> String {
        let section = record.section();
        let entity_id = record.id().to_string();
        let trash_id = self.next_trash_id(&entity_id);
        let item = TrashItem {
            id: trash_id.clone(),
            deleted_at: self.clock.now_millis(),
            payload: TrashPayload::Known(record),
        };
        self.update_items(|items| {
            let mut next = Vec::with_capacity(items.len() + 1);
            next.push(item);
            next.extend(items.iter().cloned());
            next
        });
        collections.remove(section, &entity_id);
        tracing::debug!(%section, entity_id = %entity_id, trash_id = %trash_id, "moved to trash");
        trash_id
    }

    pub fn trash_entity(
        &mut self,
        collections: &mut Collections,
        section: Section,
        id: &str,
    ) -> Result<String, TrashError> {
        let record = collections
            .find(section, id)
            .ok_or_else(|| TrashError::NotFound {
                section,
                id: id.to_string(),
            })?;
        Ok(self.move_to_trash(collections, record))
    }

    pub fn restore(
        &mut self,
        collections: &mut Collections,
        trash_id: &str,
    ) -> Result<RestoreOutcome, TrashError> {
        let item = self
            .get(trash_id)
            .cloned()
            .ok_or_else(|| TrashError::NotInTrash(trash_id.to_string()))?;

        let outcome = match item.payload {
            TrashPayload::Known(record) => {
                let section = record.section();
                let entity_id = record.id().to_string();
                with_record!(record, entity => restore_entity(collections, entity));
                RestoreOutcome::Restored { section, entity_id }
            }
            TrashPayload::Unreadable { section, .. } => {
                tracing::warn!(trash_id, %section, "trash item data cannot be read, keeping it");
                return Err(TrashError::UnreadableData {
                    trash_id: trash_id.to_string(),
                    section,
                });
            }
            TrashPayload::Unrecognized { section, .. } => {
                if self.strict_restore {
                    return Err(TrashError::UnknownSection {
                        trash_id: trash_id.to_string(),
                        section,
                    });
                }
                tracing::warn!(
                    trash_id,
                    section = %section,
                    "no collection accepts this trash item, dropping it"
                );
                RestoreOutcome::Dropped { section }
            }
        };

        self.remove_item(trash_id);
        Ok(outcome)
    }

    /// Restores every item, oldest deletion first. Items with unreadable
    /// data stay in trash and are reported as [`RestoreOutcome::Kept`].
    pub fn restore_all(
        &mut self,
        collections: &mut Collections,
    ) -> Result<Vec<RestoreOutcome>, TrashError> {
        let mut order: Vec<(i64, String)> = self
            .items()
            .iter()
            .rev()
            .map(|item| (item.deleted_at, item.id.clone()))
            .collect();
        order.sort_by_key(|(deleted_at, _)| *deleted_at);

        order
            .into_iter()
            .map(|(_, trash_id)| match self.restore(collections, &trash_id) {
                Err(TrashError::UnreadableData { trash_id, section }) => {
                    Ok(RestoreOutcome::Kept { trash_id, section })
                }
                other => other,
            })
            .collect()
    }

    pub fn permanently_delete<C>(
        &mut self,
        trash_id: &str,
        confirm: &C,
    ) -> Result<Decision<TrashItem>, TrashError>
    where
        C: Confirm + ?Sized,
    {
        let item = self
            .get(trash_id)
            .cloned()
            .ok_or_else(|| TrashError::NotInTrash(trash_id.to_string()))?;
        let prompt = format!(
            "Permanently delete \"{}\"? This cannot be undone.",
            item.display_name()
        );
        if !confirm.confirm(&prompt) {
            return Ok(Decision::Declined);
        }
        self.remove_item(trash_id);
        tracing::info!(trash_id, "trash item purged");
        Ok(Decision::Proceeded(item))
    }

    pub fn empty_trash<C>(&mut self, confirm: &C) -> Decision<usize>
    where
        C: Confirm + ?Sized,
    {
        let count = self.len();
        if count == 0 {
            return Decision::Proceeded(0);
        }
        let prompt = format!("Permanently delete all {count} items in trash?");
        if !confirm.confirm(&prompt) {
            return Decision::Declined;
        }
        self.items.set(EntityList::default());
        tracing::info!(count, "trash emptied");
        Decision::Proceeded(count)
    }

    /// Drops every item whose retention window has passed at `now`.
    pub fn sweep_expired(&mut self, now: i64) -> usize {
        let retention = self.retention_millis;
        let expired = self
            .items()
            .iter()
            .filter(|item| expiry::is_expired(item.deleted_at, retention, now))
            .count();
        if expired > 0 {
            self.update_items(|items| {
                items
                    .iter()
                    .filter(|item| !expiry::is_expired(item.deleted_at, retention, now))
                    .cloned()
                    .collect()
            });
        }
        expired
    }

    /// Trashes a note folder. A folder that still holds notes asks first and
    /// then trashes each note before the folder itself.
    pub fn delete_note_folder<C>(
        &mut self,
        collections: &mut Collections,
        folder_id: &str,
        confirm: &C,
    ) -> Result<Decision<FolderDeletion>, TrashError>
    where
        C: Confirm + ?Sized,
    {
        let folder = collections
            .find(Section::NoteFolders, folder_id)
            .ok_or_else(|| TrashError::NotFound {
                section: Section::NoteFolders,
                id: folder_id.to_string(),
            })?;
        let notes = collections.notes_in_folder(folder_id);

        if !notes.is_empty() {
            let prompt = format!(
                "Folder \"{}\" contains {} notes. Move the folder and its notes to trash?",
                folder.display_name(),
                notes.len()
            );
            if !confirm.confirm(&prompt) {
                return Ok(Decision::Declined);
            }
        }

        let note_trash_ids = notes
            .into_iter()
            .map(|note| self.move_to_trash(collections, note.into_record()))
            .collect();
        let folder_trash_id = self.move_to_trash(collections, folder);
        Ok(Decision::Proceeded(FolderDeletion {
            folder_trash_id,
            note_trash_ids,
        }))
    }

    pub fn expiry_status(&self, item: &TrashItem, now: i64) -> ExpiryStatus {
        expiry::expiry_status(item.deleted_at, self.retention_millis, now)
    }

    /// Replaces the whole trash sequence. Used by backup import.
    pub fn replace_all(&mut self, items: impl Into<EntityList<TrashItem>>) {
        self.items.set(items.into());
    }

    fn update_items<F>(&mut self, f: F)
    where
        F: FnOnce(&[TrashItem]) -> Vec<TrashItem>,
    {
        self.items.update(|list| list.with_items(f(list.items())));
    }

    fn remove_item(&mut self, trash_id: &str) {
        self.update_items(|items| {
            items
                .iter()
                .filter(|item| item.id != trash_id)
                .cloned()
                .collect()
        });
    }

    fn next_trash_id(&mut self, entity_id: &str) -> String {
        let mut stamp = self.clock.now_millis().max(self.last_stamp.saturating_add(1));
        loop {
            let candidate = format!("trash-{entity_id}-{stamp}");
            if self.get(&candidate).is_none() {
                self.last_stamp = stamp;
                return candidate;
            }
            stamp += 1;
        }
    }
}

impl std::fmt::Debug for TrashManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashManager")
            .field("items", &self.items().len())
            .field("retention_millis", &self.retention_millis)
            .field("strict_restore", &self.strict_restore)
            .finish()
    }
}

fn restore_entity<T: Entity>(collections: &mut Collections, entity: T) {
    collections.update::<T, _>(|items| {
        let mut next = items.to_vec();
        next.push(entity);
        T::sort_canonical(&mut next);
        next
    });
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::clock::{FixedClock, MILLIS_PER_DAY};
    use crate::confirm::{AssumeNo, AssumeYes};
    use crate::model::{Movie, Note, NoteFolder, TodoTask, Transaction};
    use crate::storage::{MemoryBackend, StorageBackend};

    const START: i64 = 1_700_000_000_000;

    struct Fixture {
        backend: SharedBackend,
        clock: Arc<FixedClock>,
        collections: Collections,
        trash: TrashManager,
    }

    fn fixture(options: TrashOptions) -> Fixture {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(START));
        Fixture {
            collections: Collections::load(backend.clone()),
            trash: TrashManager::load(backend.clone(), &options, clock.clone()),
            backend,
            clock,
        }
    }

    fn milk() -> TodoTask {
        TodoTask {
            id: "1".into(),
            text: "Buy milk".into(),
            completed: false,
            created_at: 100,
            ..Default::default()
        }
    }

    fn tx(id: &str, date: &str) -> Transaction {
        Transaction {
            id: id.into(),
            description: format!("tx {id}"),
            date: date.into(),
            ..Default::default()
        }
    }

    #[test]
    fn trash_then_restore_returns_the_task() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![milk()]);

        let trash_id = fx
            .trash
            .trash_entity(&mut fx.collections, Section::Todo, "1")?;
        assert!(fx.collections.get::<TodoTask>().is_empty());
        assert_eq!(fx.trash.len(), 1);
        assert_eq!(fx.trash.items()[0].section_tag(), "TODO");
        assert_eq!(fx.trash.items()[0].deleted_at, START);
        assert_eq!(trash_id, format!("trash-1-{START}"));

        let outcome = fx.trash.restore(&mut fx.collections, &trash_id)?;
        assert_matches!(outcome, RestoreOutcome::Restored { section: Section::Todo, ref entity_id } if entity_id == "1");
        assert_eq!(fx.collections.get::<TodoTask>(), &[milk()]);
        assert!(fx.trash.is_empty());
        Ok(())
    }

    #[test]
    fn restore_reapplies_the_collection_order() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        let before = vec![
            tx("c", "2024-03-01"),
            tx("b", "2024-02-01"),
            tx("a", "2024-01-01"),
        ];
        fx.collections.set(before.clone());

        let trash_id = fx
            .trash
            .trash_entity(&mut fx.collections, Section::Budget, "b")?;
        fx.trash.restore(&mut fx.collections, &trash_id)?;
        assert_eq!(fx.collections.get::<Transaction>(), before.as_slice());
        Ok(())
    }

    #[test]
    fn trash_ids_stay_unique_within_one_millisecond() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![milk()]);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let trash_id = fx
                .trash
                .trash_entity(&mut fx.collections, Section::Todo, "1")?;
            assert!(!seen.contains(&trash_id), "duplicate trash id {trash_id}");
            seen.push(trash_id.clone());
            fx.trash.restore(&mut fx.collections, &trash_id)?;
        }
        assert_eq!(fx.clock.now_millis(), START);
        Ok(())
    }

    #[test]
    fn trash_id_skips_ids_left_by_an_earlier_run() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![milk()]);
        fx.trash.trash_entity(&mut fx.collections, Section::Todo, "1")?;

        // A fresh manager has no memory of the stamp it last issued.
        let mut reopened = TrashManager::load(
            fx.backend.clone(),
            &TrashOptions::default(),
            fx.clock.clone(),
        );
        fx.collections.set(vec![milk()]);
        let second = reopened.trash_entity(&mut fx.collections, Section::Todo, "1")?;
        assert_eq!(second, format!("trash-1-{}", START + 1));
        assert_eq!(reopened.len(), 2);
        Ok(())
    }

    #[test]
    fn startup_sweep_honours_the_retention_window() {
        let mut fx = fixture(TrashOptions::default());
        let old = milk();
        let recent = TodoTask {
            id: "2".into(),
            ..milk()
        };
        fx.collections.set(vec![old, recent]);

        fx.clock.set(START - 31 * MILLIS_PER_DAY);
        fx.trash
            .trash_entity(&mut fx.collections, Section::Todo, "1")
            .unwrap();
        fx.clock.set(START - 29 * MILLIS_PER_DAY);
        fx.trash
            .trash_entity(&mut fx.collections, Section::Todo, "2")
            .unwrap();

        assert_eq!(fx.trash.sweep_expired(START), 1);
        assert_eq!(fx.trash.len(), 1);
        assert_eq!(fx.trash.items()[0].original_id(), Some("2"));

        let snapshot = fx.trash.items().to_vec();
        assert_eq!(fx.trash.sweep_expired(START), 0);
        assert_eq!(fx.trash.items(), snapshot.as_slice());
    }

    #[test]
    fn item_exactly_at_retention_is_swept() {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![milk()]);
        fx.trash
            .trash_entity(&mut fx.collections, Section::Todo, "1")
            .unwrap();
        assert_eq!(fx.trash.sweep_expired(START + 30 * MILLIS_PER_DAY - 1), 0);
        assert_eq!(fx.trash.sweep_expired(START + 30 * MILLIS_PER_DAY), 1);
    }

    #[test]
    fn zero_retention_never_sweeps() {
        let mut fx = fixture(TrashOptions {
            retention_days: 0,
            ..TrashOptions::default()
        });
        fx.collections.set(vec![milk()]);
        fx.trash
            .trash_entity(&mut fx.collections, Section::Todo, "1")
            .unwrap();
        assert_eq!(fx.trash.sweep_expired(START + 3_650 * MILLIS_PER_DAY), 0);
        let status = fx.trash.expiry_status(&fx.trash.items()[0], START);
        assert!(status.indefinite);
    }

    fn unknown_item() -> TrashItem {
        TrashItem {
            id: "trash-x-1".into(),
            deleted_at: START,
            payload: TrashPayload::Unrecognized {
                section: "PAYROLL".into(),
                data: serde_json::json!({"id": "x"}),
            },
        }
    }

    #[test]
    fn unknown_section_is_dropped_by_default() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.trash.replace_all(vec![unknown_item()]);

        let outcome = fx.trash.restore(&mut fx.collections, "trash-x-1")?;
        assert_eq!(
            outcome,
            RestoreOutcome::Dropped {
                section: "PAYROLL".into()
            }
        );
        assert!(fx.trash.is_empty());
        assert_eq!(fx.collections.total(), 0);
        Ok(())
    }

    #[test]
    fn strict_mode_keeps_unknown_items_in_trash() {
        let mut fx = fixture(TrashOptions {
            strict_restore: true,
            ..TrashOptions::default()
        });
        fx.trash.replace_all(vec![unknown_item()]);

        let err = fx.trash.restore(&mut fx.collections, "trash-x-1");
        assert_matches!(err, Err(TrashError::UnknownSection { ref section, .. }) if section == "PAYROLL");
        assert_eq!(fx.trash.len(), 1);
    }

    #[test]
    fn restore_of_missing_item_is_an_error() {
        let mut fx = fixture(TrashOptions::default());
        assert_eq!(
            fx.trash.restore(&mut fx.collections, "nope"),
            Err(TrashError::NotInTrash("nope".into()))
        );
        assert_matches!(
            fx.trash.trash_entity(&mut fx.collections, Section::Books, "nope"),
            Err(TrashError::NotFound { section: Section::Books, .. })
        );
    }

    fn folder_fixture() -> Fixture {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![
            NoteFolder {
                id: "F".into(),
                name: "Work".into(),
                ..Default::default()
            },
            NoteFolder {
                id: "E".into(),
                name: "Empty".into(),
                ..Default::default()
            },
        ]);
        fx.collections.set(
            ["N1", "N2", "N3"]
                .into_iter()
                .map(|id| Note {
                    id: id.into(),
                    title: id.into(),
                    folder_id: (id != "N3").then(|| "F".to_string()),
                    ..Default::default()
                })
                .collect(),
        );
        fx
    }

    #[test]
    fn deleting_a_folder_cascades_to_its_notes() -> anyhow::Result<()> {
        let mut fx = folder_fixture();
        let asked = std::cell::Cell::new(0);
        let confirm = |_: &str| {
            asked.set(asked.get() + 1);
            true
        };

        let deletion = fx
            .trash
            .delete_note_folder(&mut fx.collections, "F", &confirm)?
            .proceeded()
            .ok_or_else(|| anyhow::anyhow!("folder delete declined"))?;
        assert_eq!(asked.get(), 1);
        assert_eq!(deletion.note_trash_ids.len(), 2);
        assert_eq!(fx.trash.len(), 3);

        let tags: Vec<_> = fx.trash.items().iter().map(|i| i.section_tag()).collect();
        assert_eq!(tags, vec!["NoteFolders", "NOTES", "NOTES"]);

        let notes: Vec<_> = fx
            .collections
            .get::<Note>()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(notes, vec!["N3"]);
        assert!(fx.collections.find(Section::NoteFolders, "F").is_none());
        Ok(())
    }

    #[test]
    fn declined_folder_delete_changes_nothing() -> anyhow::Result<()> {
        let mut fx = folder_fixture();
        let decision = fx
            .trash
            .delete_note_folder(&mut fx.collections, "F", &AssumeNo)?;
        assert!(decision.is_declined());
        assert!(fx.trash.is_empty());
        assert_eq!(fx.collections.get::<Note>().len(), 3);
        assert_eq!(fx.collections.get::<NoteFolder>().len(), 2);
        Ok(())
    }

    #[test]
    fn empty_folder_is_trashed_without_asking() -> anyhow::Result<()> {
        let mut fx = folder_fixture();
        let decision = fx
            .trash
            .delete_note_folder(&mut fx.collections, "E", &AssumeNo)?;
        assert_matches!(decision, Decision::Proceeded(FolderDeletion { ref note_trash_ids, .. }) if note_trash_ids.is_empty());
        assert_eq!(fx.trash.len(), 1);
        Ok(())
    }

    #[test]
    fn purge_and_empty_respect_confirmation() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![
            milk(),
            TodoTask {
                id: "2".into(),
                ..milk()
            },
        ]);
        let first = fx
            .trash
            .trash_entity(&mut fx.collections, Section::Todo, "1")?;
        fx.trash.trash_entity(&mut fx.collections, Section::Todo, "2")?;

        assert!(fx.trash.permanently_delete(&first, &AssumeNo)?.is_declined());
        assert_eq!(fx.trash.len(), 2);
        let purged = fx.trash.permanently_delete(&first, &AssumeYes)?;
        assert_matches!(purged, Decision::Proceeded(ref item) if item.id == first);
        assert_eq!(fx.trash.len(), 1);
        assert_eq!(
            fx.trash.permanently_delete(&first, &AssumeYes),
            Err(TrashError::NotInTrash(first.clone()))
        );

        assert!(fx.trash.empty_trash(&AssumeNo).is_declined());
        assert_eq!(fx.trash.len(), 1);
        assert_eq!(fx.trash.empty_trash(&AssumeYes), Decision::Proceeded(1));
        assert!(fx.trash.is_empty());
        assert!(fx.collections.get::<TodoTask>().is_empty());
        Ok(())
    }

    #[test]
    fn restore_all_goes_oldest_first() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![
            tx("a", "2024-01-01"),
            tx("b", "2024-02-01"),
        ]);
        fx.trash.trash_entity(&mut fx.collections, Section::Budget, "a")?;
        fx.clock.advance(1_000);
        fx.trash.trash_entity(&mut fx.collections, Section::Budget, "b")?;

        let outcomes = fx.trash.restore_all(&mut fx.collections)?;
        let ids: Vec<_> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RestoreOutcome::Restored { entity_id, .. } => Some(entity_id.as_str()),
                RestoreOutcome::Dropped { .. } | RestoreOutcome::Kept { .. } => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(fx.trash.is_empty());
        let dates: Vec<_> = fx
            .collections
            .get::<Transaction>()
            .iter()
            .map(|t| t.date.as_str())
            .collect();
        assert_eq!(dates, vec!["2024-02-01", "2024-01-01"]);
        Ok(())
    }

    #[test]
    fn trash_survives_reload() -> anyhow::Result<()> {
        let mut fx = fixture(TrashOptions::default());
        fx.collections.set(vec![milk()]);
        fx.trash.trash_entity(&mut fx.collections, Section::Todo, "1")?;

        let raw = fx
            .backend
            .read(keys::TRASH)?
            .ok_or_else(|| anyhow::anyhow!("trash not persisted"))?;
        let stored: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(stored[0]["originalSection"], "TODO");
        assert_eq!(stored[0]["data"]["text"], "Buy milk");

        let reopened = TrashManager::load(
            fx.backend.clone(),
            &TrashOptions::default(),
            fx.clock.clone(),
        );
        assert_eq!(reopened.items(), fx.trash.items());
        Ok(())
    }

    fn fixture_with_stored_trash(raw: &str, options: TrashOptions) -> Fixture {
        let memory = Arc::new(MemoryBackend::new());
        memory.insert_raw(keys::TRASH, raw);
        let backend: SharedBackend = memory;
        let clock = Arc::new(FixedClock::new(START));
        Fixture {
            collections: Collections::load(backend.clone()),
            trash: TrashManager::load(backend.clone(), &options, clock.clone()),
            backend,
            clock,
        }
    }

    #[test]
    fn trashed_record_with_null_fields_restores() -> anyhow::Result<()> {
        let mut fx = fixture_with_stored_trash(
            r#"[{"id":"trash-m2-1","deletedAt":1,"originalSection":"MOVIES",
                "data":{"id":"m2","title":"Brazil","notes":null,"createdAt":"1700"}}]"#,
            TrashOptions::default(),
        );
        assert_eq!(fx.trash.len(), 1);

        let outcome = fx.trash.restore(&mut fx.collections, "trash-m2-1")?;
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                section: Section::Movies,
                entity_id: "m2".into()
            }
        );
        let movies = fx.collections.get::<Movie>();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Brazil");
        assert_eq!(movies[0].created_at, 1700);
        assert!(fx.trash.is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_data_under_a_known_section_stays_in_trash() -> anyhow::Result<()> {
        let raw = r#"[{"id":"trash-t-1","deletedAt":1,"originalSection":"BUDGET",
            "data":{"id":"t","amount":"lots"}}]"#;
        let mut fx = fixture_with_stored_trash(raw, TrashOptions::default());

        let err = fx.trash.restore(&mut fx.collections, "trash-t-1");
        assert_matches!(
            err,
            Err(TrashError::UnreadableData { ref trash_id, section: Section::Budget })
                if trash_id == "trash-t-1"
        );
        assert_eq!(fx.trash.len(), 1);
        assert_eq!(fx.collections.total(), 0);

        let outcomes = fx.trash.restore_all(&mut fx.collections)?;
        assert_eq!(
            outcomes,
            vec![RestoreOutcome::Kept {
                trash_id: "trash-t-1".into(),
                section: Section::Budget
            }]
        );
        assert_eq!(fx.trash.len(), 1);

        let stored: serde_json::Value =
            serde_json::from_str(&fx.backend.read(keys::TRASH)?.unwrap_or_default())?;
        assert_eq!(stored[0]["data"]["amount"], "lots");
        Ok(())
    }

    #[test]
    fn undecodable_trash_entries_outlive_other_changes() -> anyhow::Result<()> {
        let mut fx = fixture_with_stored_trash(
            r#"[{"deletedAt":5,"originalSection":"TODO"},"stray"]"#,
            TrashOptions::default(),
        );
        assert!(fx.trash.is_empty());
        assert_eq!(fx.trash.list().unreadable().len(), 2);

        fx.collections.set(vec![milk()]);
        fx.trash.trash_entity(&mut fx.collections, Section::Todo, "1")?;
        let stored: serde_json::Value =
            serde_json::from_str(&fx.backend.read(keys::TRASH)?.unwrap_or_default())?;
        assert_eq!(stored.as_array().map(Vec::len), Some(3));
        assert_eq!(stored[2], "stray");
        Ok(())
    }
}
