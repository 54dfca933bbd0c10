//! Chat store access.
//!
//! [`ChatStore`] is the interface the pipeline needs from a decrypted
//! store: the owner's identifier, the contact list, and time-bounded
//! message lists. [`SqliteChatStore`] reads the normalized `chat.db`
//! produced by the decryption step; the source application's proprietary
//! schema never reaches this crate.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::models::{Contact, MessageRecord, TimeWindow};

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The account owner's own identifier, when the store records it.
    async fn owner_id(&self) -> Option<String>;

    /// All contacts known to the store.
    async fn list_contacts(&self) -> Result<Vec<Contact>>;

    /// Messages exchanged with one contact inside the window, ordered by
    /// timestamp.
    async fn list_messages(&self, contact_id: &str, window: &TimeWindow)
        -> Result<Vec<MessageRecord>>;
}

/// Opens a [`ChatStore`] over a decrypted store directory.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn open(&self, store_dir: &Path) -> Result<Box<dyn ChatStore>>;
}

/// SQLite-backed store over the normalized `chat.db`:
/// `contacts(id, nickname, remark)`, `messages(contact_id, ts, is_outgoing)`
/// with `ts` in Unix seconds, and `account(id, name)` for the owner.
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    pub async fn open(store_dir: &Path) -> Result<Self> {
        let db_path = store_dir.join("chat.db");
        if !db_path.is_file() {
            return Err(AnalysisError::DataUnavailable(format!(
                "no chat.db under {}",
                store_dir.display()
            )));
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(false)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn owner_id(&self) -> Option<String> {
        // Older stores carry no account table; the aggregator tolerates
        // an unknown owner.
        sqlx::query_scalar::<_, String>("SELECT id FROM account LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query("SELECT id, nickname, remark FROM contacts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                Contact::new(
                    row.get::<String, _>("id"),
                    row.get::<Option<String>, _>("nickname"),
                    row.get::<Option<String>, _>("remark"),
                )
            })
            .collect())
    }

    async fn list_messages(
        &self,
        contact_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            "SELECT ts, is_outgoing FROM messages \
             WHERE contact_id = ? AND ts BETWEEN ? AND ? ORDER BY ts",
        )
        .bind(contact_id)
        .bind(window.start.timestamp())
        .bind(window.end.timestamp())
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let ts: i64 = row.get("ts");
            let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                AnalysisError::DataUnavailable(format!("message timestamp {} out of range", ts))
            })?;
            messages.push(MessageRecord {
                timestamp,
                is_outgoing: row.get::<i64, _>("is_outgoing") != 0,
            });
        }
        Ok(messages)
    }
}

pub struct SqliteStoreFactory;

#[async_trait]
impl StoreFactory for SqliteStoreFactory {
    async fn open(&self, store_dir: &Path) -> Result<Box<dyn ChatStore>> {
        Ok(Box::new(SqliteChatStore::open(store_dir).await?))
    }
}
