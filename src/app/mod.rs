use std::sync::Arc;

use time::OffsetDateTime;

use crate::backup::{self, BackupDocument, ImportReport};
use crate::clock::Clock;
use crate::collections::Collections;
use crate::config::AppConfig;
use crate::confirm::{Confirm, Decision};
use crate::lock::{LockError, LockState, PinLock};
use crate::model::{EntityRecord, Section};
use crate::search::{self, SearchResult};
use crate::storage::{SharedBackend, WriteStatus};
use crate::trash::{ExpiryStatus, FolderDeletion, RestoreOutcome, TrashError, TrashItem, TrashManager};

/// What a delete request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Trashed { trash_id: String },
    Folder(FolderDeletion),
}

/// Everything a running organizer holds: the collections, the trash, and the
/// PIN lock, wired to one storage backend and one clock.
pub struct App {
    pub config: Arc<AppConfig>,
    collections: Collections,
    trash: TrashManager,
    lock: PinLock,
    lock_state: LockState,
    clock: Arc<dyn Clock>,
    swept_at_startup: usize,
}

impl App {
    /// Loads every cell, sweeps expired trash once, and locks if a PIN is set.
    pub fn open(config: Arc<AppConfig>, backend: SharedBackend, clock: Arc<dyn Clock>) -> Self {
        let collections = Collections::load(backend.clone());
        let mut trash = TrashManager::load(backend.clone(), &config.trash, clock.clone());
        let lock = PinLock::load(backend);

        let swept_at_startup = trash.sweep_expired(clock.now_millis());
        tracing::info!(
            removed = swept_at_startup,
            remaining = trash.len(),
            "startup trash sweep finished"
        );
        let lock_state = lock.initial_state();

        Self {
            config,
            collections,
            trash,
            lock,
            lock_state,
            clock,
            swept_at_startup,
        }
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut Collections {
        &mut self.collections
    }

    pub fn trash(&self) -> &TrashManager {
        &self.trash
    }

    pub fn swept_at_startup(&self) -> usize {
        self.swept_at_startup
    }

    pub fn now_utc(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state == LockState::Locked
    }

    pub fn unlock(&mut self, attempt: &str) -> bool {
        if self.lock.unlock(attempt) {
            self.lock_state = LockState::Unlocked;
            true
        } else {
            tracing::warn!("PIN attempt rejected");
            false
        }
    }

    pub fn has_pin(&self) -> bool {
        self.lock.has_pin()
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<WriteStatus, LockError> {
        self.lock.set_pin(pin)
    }

    pub fn clear_pin(&mut self) -> WriteStatus {
        self.lock.clear_pin()
    }

    /// Inserts a new entity, filling in a missing id and creation time.
    pub fn add(&mut self, mut record: EntityRecord) -> EntityRecord {
        record.stamp_new(self.clock.now_millis());
        self.collections.insert(record.clone());
        record
    }

    /// Sends an entity to trash. Folders take their notes with them.
    pub fn delete<C>(
        &mut self,
        section: Section,
        id: &str,
        confirm: &C,
    ) -> Result<Decision<DeleteOutcome>, TrashError>
    where
        C: Confirm + ?Sized,
    {
        if section == Section::NoteFolders {
            let decision = self
                .trash
                .delete_note_folder(&mut self.collections, id, confirm)?;
            return Ok(match decision {
                Decision::Proceeded(deletion) => Decision::Proceeded(DeleteOutcome::Folder(deletion)),
                Decision::Declined => Decision::Declined,
            });
        }
        let trash_id = self.trash.trash_entity(&mut self.collections, section, id)?;
        Ok(Decision::Proceeded(DeleteOutcome::Trashed { trash_id }))
    }

    pub fn restore(&mut self, trash_id: &str) -> Result<RestoreOutcome, TrashError> {
        self.trash.restore(&mut self.collections, trash_id)
    }

    pub fn restore_all(&mut self) -> Result<Vec<RestoreOutcome>, TrashError> {
        self.trash.restore_all(&mut self.collections)
    }

    pub fn purge<C>(&mut self, trash_id: &str, confirm: &C) -> Result<Decision<TrashItem>, TrashError>
    where
        C: Confirm + ?Sized,
    {
        self.trash.permanently_delete(trash_id, confirm)
    }

    pub fn empty_trash<C>(&mut self, confirm: &C) -> Decision<usize>
    where
        C: Confirm + ?Sized,
    {
        self.trash.empty_trash(confirm)
    }

    pub fn sweep_trash(&mut self) -> usize {
        let now = self.clock.now_millis();
        self.trash.sweep_expired(now)
    }

    pub fn expiry_status(&self, item: &TrashItem) -> ExpiryStatus {
        self.trash.expiry_status(item, self.clock.now_millis())
    }

    pub fn clear_purchased_groceries(&mut self) -> usize {
        self.collections.clear_purchased_groceries()
    }

    /// Searches with the configured result cap.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        search::search_with(&self.collections, query, &self.config.search)
    }

    pub fn search_limited(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        search::search(&self.collections, query, limit)
    }

    pub fn export_backup(&self) -> BackupDocument {
        backup::export_all(&self.collections, &self.trash, self.clock.as_ref())
    }

    pub fn import_backup<C>(&mut self, document: BackupDocument, confirm: &C) -> Decision<ImportReport>
    where
        C: Confirm + ?Sized,
    {
        backup::import_all(&mut self.collections, &mut self.trash, document, confirm)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("lock_state", &self.lock_state)
            .field("trash", &self.trash)
            .field("entities", &self.collections.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::clock::{FixedClock, MILLIS_PER_DAY};
    use crate::confirm::AssumeYes;
    use crate::model::{Note, NoteFolder, TodoTask};
    use crate::storage::MemoryBackend;

    const NOW: i64 = 1_700_000_000_000;

    fn open(backend: &SharedBackend, clock: &Arc<FixedClock>) -> App {
        App::open(Arc::new(AppConfig::default()), backend.clone(), clock.clone())
    }

    #[test]
    fn startup_sweeps_expired_trash_once() -> anyhow::Result<()> {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(NOW - 31 * MILLIS_PER_DAY));
        {
            let mut app = open(&backend, &clock);
            app.add(EntityRecord::Todo(TodoTask {
                id: "old".into(),
                ..Default::default()
            }));
            app.add(EntityRecord::Todo(TodoTask {
                id: "new".into(),
                ..Default::default()
            }));
            app.delete(Section::Todo, "old", &AssumeYes)?;
            clock.set(NOW - 29 * MILLIS_PER_DAY);
            app.delete(Section::Todo, "new", &AssumeYes)?;
            assert_eq!(app.trash().len(), 2);
        }

        clock.set(NOW);
        let app = open(&backend, &clock);
        assert_eq!(app.swept_at_startup(), 1);
        assert_eq!(app.trash().items()[0].original_id(), Some("new"));

        let again = open(&backend, &clock);
        assert_eq!(again.swept_at_startup(), 0);
        Ok(())
    }

    #[test]
    fn stored_pin_locks_the_next_start() -> anyhow::Result<()> {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let mut app = open(&backend, &clock);
        assert!(!app.is_locked());
        app.set_pin("2468")?;

        let mut relaunched = open(&backend, &clock);
        assert_eq!(relaunched.lock_state(), LockState::Locked);
        assert!(!relaunched.unlock("1357"));
        assert!(relaunched.is_locked());
        assert!(relaunched.unlock("2468"));
        assert_eq!(relaunched.lock_state(), LockState::Unlocked);
        Ok(())
    }

    #[test]
    fn add_stamps_missing_ids_and_times() -> anyhow::Result<()> {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let mut app = open(&backend, &clock);
        let record = EntityRecord::from_value(Section::Notes, json!({"title": "Ideas"}))?;
        let added = app.add(record);
        assert!(added.id().starts_with(&format!("{NOW}-")));
        assert_matches!(added, EntityRecord::Notes(ref note) if note.created_at == NOW && note.updated_at == NOW);
        assert_eq!(app.collections().len(Section::Notes), 1);
        Ok(())
    }

    #[test]
    fn deleting_a_folder_through_the_app_cascades() -> anyhow::Result<()> {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let mut app = open(&backend, &clock);
        app.add(EntityRecord::NoteFolders(NoteFolder {
            id: "F".into(),
            name: "Trips".into(),
            ..Default::default()
        }));
        for id in ["N1", "N2"] {
            app.add(EntityRecord::Notes(Note {
                id: id.into(),
                folder_id: Some("F".into()),
                ..Default::default()
            }));
        }

        let outcome = app.delete(Section::NoteFolders, "F", &AssumeYes)?;
        assert_matches!(outcome, Decision::Proceeded(DeleteOutcome::Folder(ref d)) if d.note_trash_ids.len() == 2);
        assert_eq!(app.trash().len(), 3);
        assert_eq!(app.collections().len(Section::Notes), 0);
        assert_eq!(app.collections().len(Section::NoteFolders), 0);
        Ok(())
    }

    #[test]
    fn search_uses_the_configured_cap() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let mut config = AppConfig::default();
        config.search.max_results = 2;
        let mut app = App::open(Arc::new(config), backend, clock);
        for i in 0..5 {
            app.add(EntityRecord::Todo(TodoTask {
                id: format!("t{i}"),
                text: format!("call {i}"),
                ..Default::default()
            }));
        }
        assert_eq!(app.search("call").len(), 2);
        assert_eq!(app.search_limited("call", 10).len(), 5);
    }
}
