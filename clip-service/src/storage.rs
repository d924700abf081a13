//! SQLite key/value storage for the item list, boards and settings
//!
//! Each key holds one JSON document that is rewritten as a whole on every
//! write. There is no per-item partial update.

use crate::item::{Board, ClipboardItem};
use crate::settings::Settings;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

pub const ITEMS_KEY: &str = "clipboardItems";
pub const SETTINGS_KEY: &str = "settings";
pub const BOARDS_KEY: &str = "boards";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// SQLite storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// Read and decode the document stored under `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replace the document stored under `key`
    pub fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        put_raw(&self.conn, key, &raw)
    }

    pub fn load_items(&self) -> Result<Vec<ClipboardItem>, StorageError> {
        Ok(self.get_json(ITEMS_KEY)?.unwrap_or_default())
    }

    pub fn save_items(&self, items: &[ClipboardItem]) -> Result<(), StorageError> {
        self.put_json(ITEMS_KEY, items)
    }

    pub fn load_boards(&self) -> Result<Vec<Board>, StorageError> {
        Ok(self.get_json(BOARDS_KEY)?.unwrap_or_default())
    }

    pub fn save_boards(&self, boards: &[Board]) -> Result<(), StorageError> {
        self.put_json(BOARDS_KEY, boards)
    }

    /// Stored settings, or defaults when nothing was saved yet
    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        Ok(self.get_json(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.put_json(SETTINGS_KEY, settings)
    }

    /// Write items and boards in one transaction
    pub fn save_items_and_boards(
        &mut self,
        items: &[ClipboardItem],
        boards: &[Board],
    ) -> Result<(), StorageError> {
        let items_raw = serde_json::to_string(items)?;
        let boards_raw = serde_json::to_string(boards)?;

        let tx = self.conn.transaction()?;
        put_raw(&tx, ITEMS_KEY, &items_raw)?;
        put_raw(&tx, BOARDS_KEY, &boards_raw)?;
        tx.commit()?;
        Ok(())
    }

    /// Write settings and the (possibly truncated) item list in one transaction
    pub fn save_settings_and_items(
        &mut self,
        settings: &Settings,
        items: &[ClipboardItem],
    ) -> Result<(), StorageError> {
        let settings_raw = serde_json::to_string(settings)?;
        let items_raw = serde_json::to_string(items)?;

        let tx = self.conn.transaction()?;
        put_raw(&tx, SETTINGS_KEY, &settings_raw)?;
        put_raw(&tx, ITEMS_KEY, &items_raw)?;
        tx.commit()?;
        Ok(())
    }
}

fn put_raw(conn: &Connection, key: &str, raw: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, raw],
    )?;
    Ok(())
}
