//! Notification recipients.
//!
//! Recipients are chat identifiers. Both implementations serialize access
//! internally so the bot's command handler and the publisher can share one
//! store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::{StoreError, StoreResult};

pub type ChatId = i64;

pub trait SubscriberStore: Send + Sync {
    /// Returns `true` if the chat was not subscribed before.
    fn add(&self, chat_id: ChatId) -> StoreResult<bool>;

    /// Returns `true` if the chat was subscribed.
    fn remove(&self, chat_id: ChatId) -> StoreResult<bool>;

    /// All subscribed chats, ascending.
    fn list(&self) -> StoreResult<Vec<ChatId>>;
}

#[derive(Debug, Default)]
pub struct MemorySubscriberStore {
    chats: Mutex<BTreeSet<ChatId>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriberStore for MemorySubscriberStore {
    fn add(&self, chat_id: ChatId) -> StoreResult<bool> {
        let mut chats = self.chats.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(chats.insert(chat_id))
    }

    fn remove(&self, chat_id: ChatId) -> StoreResult<bool> {
        let mut chats = self.chats.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(chats.remove(&chat_id))
    }

    fn list(&self) -> StoreResult<Vec<ChatId>> {
        let chats = self.chats.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(chats.iter().copied().collect())
    }
}

/// Subscriptions that survive restarts (`subscribers` table).
pub struct SqliteSubscriberStore {
    conn: Mutex<Connection>,
}

impl SqliteSubscriberStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS subscribers (
                chat_id INTEGER PRIMARY KEY,
                subscribed_at TEXT DEFAULT (datetime('now'))
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SubscriberStore for SqliteSubscriberStore {
    fn add(&self, chat_id: ChatId) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO subscribers (chat_id) VALUES (?1)",
            params![chat_id],
        )?;
        Ok(inserted > 0)
    }

    fn remove(&self, chat_id: ChatId) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let deleted = conn.execute(
            "DELETE FROM subscribers WHERE chat_id = ?1",
            params![chat_id],
        )?;
        Ok(deleted > 0)
    }

    fn list(&self) -> StoreResult<Vec<ChatId>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT chat_id FROM subscribers ORDER BY chat_id")?;
        let chats = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<ChatId>>>()?;
        Ok(chats)
    }
}
