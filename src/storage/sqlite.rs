//! SQLite-backed reading store
//!
//! Two tables: `channels` holds channel records, `data` holds readings.
//! There is no foreign key between them; deleting a channel's readings is
//! the caller's job (see `Channel::delete`).
//!
//! All statements are parameterised. Each store call runs exactly one
//! statement while holding the connection mutex, so a scan sees one
//! consistent snapshot and append/delete are atomic.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{ChannelRecord, NewChannel, Reading, TimeFilter, ValueSummary};
use crate::storage::{ChannelStore, ReadingStore};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Schema version written to `PRAGMA user_version`
const SCHEMA_VERSION: i32 = 1;

/// SQLite store for readings and channel records
pub struct SqliteStore {
    /// std::sync::Mutex because a rusqlite Connection is !Sync
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        tracing::info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Create tables and indexes if they are missing
fn initialize(conn: &Connection) -> StorageResult<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_channels_type ON channels(type);

        CREATE TABLE IF NOT EXISTS data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            value REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_data_channel_time ON data(channel_id, timestamp);
        ",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    tracing::debug!("Initialized schema version {}", SCHEMA_VERSION);
    Ok(())
}

/// WHERE clause for one channel plus the bounds of `filter`
fn where_clause(channel_id: i64, filter: &TimeFilter) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE channel_id = ?");
    let mut values = vec![Value::Integer(channel_id)];

    let (from, to) = filter.bounds();
    if let Some(to) = to {
        sql.push_str(" AND timestamp < ?");
        values.push(Value::Integer(to));
    }
    if let Some(from) = from {
        sql.push_str(" AND timestamp > ?");
        values.push(Value::Integer(from));
    }

    (sql, values)
}

fn channel_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRecord> {
    Ok(ChannelRecord {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl ReadingStore for SqliteStore {
    async fn append(&self, reading: &Reading) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO data (channel_id, timestamp, value) VALUES (?1, ?2, ?3)",
            params![reading.channel_id, reading.timestamp, reading.value],
        )?;
        Ok(())
    }

    async fn scan(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<Vec<Reading>> {
        let (clause, values) = where_clause(channel_id, filter);
        let sql = format!(
            "SELECT channel_id, timestamp, value FROM data {} ORDER BY timestamp DESC, id DESC",
            clause
        );

        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let readings = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(Reading {
                    channel_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(channel_id, rows = readings.len(), "Scanned readings");
        Ok(readings)
    }

    async fn delete_range(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<u64> {
        let (clause, values) = where_clause(channel_id, filter);
        let sql = format!("DELETE FROM data {}", clause);

        let conn = self.conn.lock()?;
        let removed = conn.execute(&sql, params_from_iter(values))?;

        tracing::debug!(channel_id, removed, "Deleted readings");
        Ok(removed as u64)
    }

    async fn summarize(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<ValueSummary> {
        let (clause, values) = where_clause(channel_id, filter);
        let sql = format!(
            "SELECT COUNT(value), MIN(value), MAX(value), TOTAL(value) FROM data {}",
            clause
        );

        let conn = self.conn.lock()?;
        let summary = conn.query_row(&sql, params_from_iter(values), |row| {
            Ok(ValueSummary {
                count: row.get::<_, i64>(0)? as u64,
                min: row.get(1)?,
                max: row.get(2)?,
                sum: row.get(3)?,
            })
        })?;

        Ok(summary)
    }
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn insert_channel(&self, channel: &NewChannel) -> StorageResult<ChannelRecord> {
        let created_at = Utc::now().timestamp_millis();

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO channels (type, title, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![channel.kind, channel.title, channel.description, created_at],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(id, kind = %channel.kind, "Inserted channel record");
        Ok(ChannelRecord {
            id,
            kind: channel.kind.clone(),
            title: channel.title.clone(),
            description: channel.description.clone(),
            created_at,
        })
    }

    async fn load_channel(&self, id: i64) -> StorageResult<Option<ChannelRecord>> {
        let conn = self.conn.lock()?;
        let record = conn
            .query_row(
                "SELECT id, type, title, description, created_at FROM channels WHERE id = ?",
                [id],
                channel_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_channels(&self, kind: Option<&str>) -> StorageResult<Vec<ChannelRecord>> {
        let conn = self.conn.lock()?;
        let records = match kind {
            Some(kind) => conn
                .prepare_cached(
                    "SELECT id, type, title, description, created_at FROM channels
                     WHERE type = ? ORDER BY id",
                )?
                .query_map([kind], channel_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => conn
                .prepare_cached(
                    "SELECT id, type, title, description, created_at FROM channels ORDER BY id",
                )?
                .query_map([], channel_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(records)
    }

    async fn remove_channel(&self, id: i64) -> StorageResult<bool> {
        let conn = self.conn.lock()?;
        let removed = conn.execute("DELETE FROM channels WHERE id = ?", [id])?;
        Ok(removed > 0)
    }
}
