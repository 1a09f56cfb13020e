//! A single persisted key/value cell.
//!
//! The cell is seeded from storage when it is loaded and writes the whole
//! value back on every change. Reads never fail: a missing, unreadable, or
//! corrupt record yields the default. A stored record that does not decode is
//! first copied to `<key>.unreadable` (or `<key>.unreadable.N`). If that copy
//! or the read itself fails, the cell refuses to write until a reload
//! succeeds, so the record is never overwritten unseen. Writes never block the
//! caller either: when serialization or the backend fails, the error is logged
//! and the new value is kept in memory only, so it is lost on reload unless a
//! later write succeeds.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::SharedBackend;

/// Whether the last change reached durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Persisted,
    MemoryOnly,
}

pub struct PersistedCell<T> {
    key: &'static str,
    value: T,
    default: T,
    backend: SharedBackend,
    writes_blocked: bool,
}

impl<T> PersistedCell<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn load(backend: SharedBackend, key: &'static str, default: T) -> Self {
        let (value, writes_blocked) = read_or_default(&backend, key, &default);
        Self {
            key,
            value,
            default,
            backend,
            writes_blocked,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// True when the stored record could not be read or copied aside.
    pub fn writes_blocked(&self) -> bool {
        self.writes_blocked
    }

    pub fn set(&mut self, value: T) -> WriteStatus {
        self.value = value;
        self.persist()
    }

    /// Replaces the value with whatever `f` derives from the current one.
    pub fn update<F>(&mut self, f: F) -> WriteStatus
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(next)
    }

    /// Re-reads the durable record, discarding any memory-only change.
    pub fn reload(&mut self) {
        let (value, writes_blocked) = read_or_default(&self.backend, self.key, &self.default);
        self.value = value;
        self.writes_blocked = writes_blocked;
    }

    fn persist(&self) -> WriteStatus {
        if self.writes_blocked {
            tracing::error!(key = self.key, "stored value was not preserved, change kept in memory only");
            return WriteStatus::MemoryOnly;
        }
        let encoded = match serde_json::to_string(&self.value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(key = self.key, error = %err, "serializing value failed, change kept in memory only");
                return WriteStatus::MemoryOnly;
            }
        };
        match self.backend.write(self.key, &encoded) {
            Ok(()) => WriteStatus::Persisted,
            Err(err) => {
                tracing::error!(key = self.key, error = %err, "writing value failed, change kept in memory only");
                WriteStatus::MemoryOnly
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PersistedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedCell")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

/// Key a stored record that does not decode is copied to.
pub fn unreadable_key(key: &str, n: usize) -> String {
    match n {
        0 => format!("{key}.unreadable"),
        n => format!("{key}.unreadable.{n}"),
    }
}

/// The loaded value, and whether writes must stay blocked.
fn read_or_default<T>(backend: &SharedBackend, key: &str, default: &T) -> (T, bool)
where
    T: Clone + DeserializeOwned,
{
    let raw = match backend.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return (default.clone(), false),
        Err(err) => {
            tracing::warn!(key, error = %err, "reading stored value failed, using default until reload");
            return (default.clone(), true);
        }
    };
    let err = match serde_json::from_str(&raw) {
        Ok(value) => return (value, false),
        Err(err) => err,
    };
    match set_aside(backend, key, &raw) {
        Ok(aside) => {
            tracing::warn!(key, error = %err, aside = %aside, "stored value does not decode, copied aside and using default");
            (default.clone(), false)
        }
        Err(copy_err) => {
            tracing::error!(key, error = %err, copy_error = %copy_err, "stored value does not decode and could not be copied aside, writes disabled");
            (default.clone(), true)
        }
    }
}

fn set_aside(backend: &SharedBackend, key: &str, raw: &str) -> anyhow::Result<String> {
    let mut n = 0;
    loop {
        let aside = unreadable_key(key, n);
        match backend.read(&aside)? {
            Some(existing) if existing == raw => return Ok(aside),
            Some(_) => n += 1,
            None => {
                backend.write(&aside, raw)?;
                return Ok(aside);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use anyhow::bail;

    use super::*;
    use crate::storage::{MemoryBackend, StorageBackend};

    struct ReadOnlyBackend;

    impl StorageBackend for ReadOnlyBackend {
        fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(Some("[1,2]".into()))
        }

        fn write(&self, key: &str, _value: &str) -> anyhow::Result<()> {
            bail!("{key} is read-only")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn keys(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn missing_record_yields_default_without_writing() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        let cell = PersistedCell::load(backend.clone(), "numbers", vec![7u32]);
        assert_eq!(cell.get(), &vec![7]);
        assert!(backend.keys()?.is_empty());
        Ok(())
    }

    #[test]
    fn set_writes_through_and_survives_reload() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        let mut cell = PersistedCell::load(backend.clone(), "numbers", Vec::<u32>::new());
        assert_eq!(cell.set(vec![1, 2, 3]), WriteStatus::Persisted);
        assert_eq!(backend.read("numbers")?.as_deref(), Some("[1,2,3]"));

        let fresh = PersistedCell::load(backend, "numbers", Vec::<u32>::new());
        assert_eq!(fresh.get(), &vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn update_sees_current_value() {
        let backend = Arc::new(MemoryBackend::new());
        let mut cell = PersistedCell::load(backend, "counter", 1i64);
        cell.update(|n| n + 1);
        cell.update(|n| n * 10);
        assert_eq!(*cell.get(), 20);
    }

    #[test]
    fn corrupt_record_falls_back_to_default() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw("numbers", "{not json");
        let cell = PersistedCell::load(backend.clone(), "numbers", vec![9u32]);
        assert_eq!(cell.get(), &vec![9]);
        assert_eq!(backend.read("numbers.unreadable")?.as_deref(), Some("{not json"));
        Ok(())
    }

    #[test]
    fn mistyped_record_is_copied_aside_before_the_next_write() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw("numbers.unreadable", "older");
        backend.insert_raw("numbers", r#"{"count":3}"#);

        let mut cell = PersistedCell::load(backend.clone(), "numbers", Vec::<u32>::new());
        assert!(cell.get().is_empty());
        assert!(!cell.writes_blocked());
        assert_eq!(cell.set(vec![1]), WriteStatus::Persisted);
        assert_eq!(backend.read("numbers.unreadable")?.as_deref(), Some("older"));
        assert_eq!(
            backend.read(&unreadable_key("numbers", 1))?.as_deref(),
            Some(r#"{"count":3}"#)
        );

        backend.insert_raw("numbers", r#"{"count":3}"#);
        cell.reload();
        assert_eq!(
            backend.keys()?,
            vec!["numbers", "numbers.unreadable", "numbers.unreadable.1"]
        );
        Ok(())
    }

    #[test]
    fn record_that_cannot_be_copied_aside_is_never_overwritten() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::with_quota(10));
        backend.insert_raw("text", "[1,2,3]");

        let mut cell = PersistedCell::load(backend.clone(), "text", String::new());
        assert!(cell.writes_blocked());
        assert_eq!(cell.set("fresh".into()), WriteStatus::MemoryOnly);
        assert_eq!(cell.get(), "fresh");
        assert_eq!(backend.read("text")?.as_deref(), Some("[1,2,3]"));

        backend.insert_raw("text", "\"ok\"");
        cell.reload();
        assert!(!cell.writes_blocked());
        assert_eq!(cell.set("fresh".into()), WriteStatus::Persisted);
        Ok(())
    }

    #[test]
    fn failed_write_still_updates_memory() {
        let mut cell = PersistedCell::load(Arc::new(ReadOnlyBackend), "numbers", Vec::<u32>::new());
        assert_eq!(cell.get(), &vec![1, 2]);
        assert_eq!(cell.set(vec![5]), WriteStatus::MemoryOnly);
        assert_eq!(cell.get(), &vec![5]);

        cell.reload();
        assert_eq!(cell.get(), &vec![1, 2]);
    }

    #[test]
    fn unserializable_value_is_kept_in_memory() {
        // JSON object keys must be strings; tuple keys cannot be encoded.
        let backend = Arc::new(MemoryBackend::new());
        let mut cell = PersistedCell::load(backend.clone(), "pairs", BTreeMap::<(u8, u8), u8>::new());
        let mut pairs = BTreeMap::new();
        pairs.insert((1, 2), 3);
        assert_eq!(cell.set(pairs), WriteStatus::MemoryOnly);
        assert_eq!(cell.get().get(&(1, 2)), Some(&3));
        assert!(backend.read("pairs").ok().flatten().is_none());
    }

    #[test]
    fn quota_failure_is_absorbed() {
        let backend = Arc::new(MemoryBackend::with_quota(16));
        let mut cell = PersistedCell::load(backend, "text", String::new());
        assert_eq!(cell.set("short".into()), WriteStatus::Persisted);
        assert_eq!(cell.set("x".repeat(64)), WriteStatus::MemoryOnly);
        assert_eq!(cell.get().len(), 64);
    }
}
