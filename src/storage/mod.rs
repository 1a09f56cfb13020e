use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

pub mod cell;
pub mod keys;
mod memory;
mod schema;

pub use cell::{PersistedCell, WriteStatus};
pub use memory::MemoryBackend;

/// Durable string-keyed, string-valued storage.
///
/// Values are opaque JSON text. Implementations must make a successful
/// `write` visible to every later `read` of the same key.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Shared handle every cell holds on to.
pub type SharedBackend = Arc<dyn StorageBackend>;

#[derive(Debug, thiserror::Error)]
#[error("storage quota exceeded writing {key}: {required} bytes needed, {quota} allowed")]
pub struct QuotaExceeded {
    pub key: String,
    pub required: usize,
    pub quota: usize,
}

/// Fails when the values under every other key plus `value` exceed `quota`.
/// Key names are not counted. A quota of 0 means unlimited.
pub(crate) fn check_quota(
    key: &str,
    other_values: usize,
    value: &str,
    quota: usize,
) -> Result<(), QuotaExceeded> {
    let required = other_values + value.len();
    if quota > 0 && required > quota {
        return Err(QuotaExceeded {
            key: key.to_string(),
            required,
            quota,
        });
    }
    Ok(())
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Clone, Copy)]
pub struct WalCheckpointStats {
    pub busy_frames: i64,
    pub wal_frames: i64,
    pub checkpointed_frames: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub id: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub path: PathBuf,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run_wal_health_check(&self) -> Result<WalCheckpointStats> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("PRAGMA wal_checkpoint(PASSIVE)")
                .context("preparing wal checkpoint pragma")?;
            let mut rows = stmt.query([]).context("executing wal checkpoint pragma")?;
            if let Some(row) = rows.next()? {
                Ok(WalCheckpointStats {
                    busy_frames: row.get(0)?,
                    wal_frames: row.get(1)?,
                    checkpointed_frames: row.get(2)?,
                })
            } else {
                bail!("wal checkpoint returned no rows");
            }
        })
    }

    pub fn record_backup(&self, path: &Path) -> Result<i64> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO backups (created_at, path) VALUES (?1, ?2)",
                params![now_millis(), path.to_string_lossy().into_owned()],
            )
            .context("recording backup")?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_backups(&self, limit: usize) -> Result<Vec<BackupRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, path FROM backups ORDER BY created_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit as i64], |row| {
                Ok(BackupRecord {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("fetching backup history")
        })
    }
}

impl StorageBackend for StorageHandle {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("reading {key}"))
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        if self.options.quota_bytes > 0 {
            let others: i64 = tx
                .query_row(
                    "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0)
                     FROM kv_store WHERE key != ?1",
                    params![key],
                    |row| row.get(0),
                )
                .context("measuring stored bytes")?;
            check_quota(key, others.max(0) as usize, value, self.options.quota_bytes)?;
        }
        tx.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_millis()],
        )
        .with_context(|| format!("writing {key}"))?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .with_context(|| format!("removing {key}"))?;
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("listing storage keys")
        })
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "storage ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)
        .context("enabling foreign keys")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}
