//! Airlock message log.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use tokio_rusqlite::Connection;

use crate::airlock::message::{AirlockMessage, SenderType};
use crate::assessment::store::StoreFuture;
use crate::common::config::StorageConfig;
use crate::common::errors::{StoreError, StoreResult};
use crate::common::ids::{MessageId, UserId};

/// Airlock store trait.
pub trait AirlockStore: Send + Sync {
    /// Append messages in order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append(&self, messages: Vec<AirlockMessage>) -> StoreFuture<'_, StoreResult<()>>;

    /// Load the most recent messages of a couple, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails or a row cannot be decoded.
    fn load_recent(
        &self,
        couple_id: String,
        limit: usize,
    ) -> StoreFuture<'_, StoreResult<Vec<AirlockMessage>>>;
}

/// `SQLite` implementation of the airlock log.
pub struct SqliteAirlockStore {
    conn: Connection,
    table: String,
}

impl SqliteAirlockStore {
    /// Open the log at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::init(conn, config.messages_table.clone()).await
    }

    /// Open a private in-memory log.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, StorageConfig::default().messages_table).await
    }

    async fn init(conn: Connection, table: String) -> StoreResult<Self> {
        let table_name = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    couple_id TEXT,
                    sender_id TEXT,
                    sender_type TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_couple
                    ON {table_name} (couple_id, seq);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

type MessageRow = (String, Option<String>, Option<String>, String, String, i64);

fn decode_row(row: MessageRow) -> StoreResult<AirlockMessage> {
    let (id, couple_id, sender_id, sender_type, content, created_at) = row;
    let id = MessageId::from_str(&id)
        .map_err(|err| StoreError::InvalidRecord(format!("invalid message id: {err}")))?;
    let sender_id = sender_id
        .map(UserId::parse)
        .transpose()
        .map_err(|err| StoreError::InvalidRecord(format!("invalid sender id: {err}")))?;
    let sender_type = SenderType::from_str(&sender_type)
        .map_err(|tag| StoreError::InvalidRecord(format!("invalid sender type: {tag}")))?;
    let created_at = Utc
        .timestamp_millis_opt(created_at)
        .single()
        .ok_or_else(|| StoreError::InvalidRecord("invalid created_at timestamp".to_string()))?;
    Ok(AirlockMessage {
        id,
        couple_id,
        sender_id,
        sender_type,
        content,
        created_at,
    })
}

impl AirlockStore for SqliteAirlockStore {
    fn append(&self, messages: Vec<AirlockMessage>) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            if messages.is_empty() {
                return Ok(());
            }

            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    {
                        let mut stmt = tx.prepare(&format!(
                            "INSERT INTO {table}
                            (id, couple_id, sender_id, sender_type, content, created_at)
                            VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                        ))?;
                        for message in messages {
                            stmt.execute(rusqlite::params![
                                message.id.to_string(),
                                message.couple_id,
                                message.sender_id.map(String::from),
                                message.sender_type.as_str(),
                                message.content,
                                message.created_at.timestamp_millis()
                            ])?;
                        }
                    }
                    tx.commit()?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn load_recent(
        &self,
        couple_id: String,
        limit: usize,
    ) -> StoreFuture<'_, StoreResult<Vec<AirlockMessage>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let limit = i64::try_from(limit)
                .map_err(|_| StoreError::InvalidRecord("limit exceeds i64".to_string()))?;
            let mut rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, couple_id, sender_id, sender_type, content, created_at
                         FROM {table}
                         WHERE couple_id = ?1
                         ORDER BY seq DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![couple_id, limit], |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                            ))
                        })?
                        .collect::<Result<Vec<MessageRow>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.reverse();
            rows.into_iter().map(decode_row).collect()
        })
    }
}
