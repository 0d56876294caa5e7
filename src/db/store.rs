//! Per-server member activity collections.
//!
//! Each server is a logical collection (the `guild_id` partition of the
//! `members` table) holding one JSON document per member. Appends go
//! through `json_insert` on the array end so every history update is a
//! single atomic statement.

use thiserror::Error;
use tracing::{debug, info};

use super::member::{MemberRecord, MemberUpdate, MessageEntry, Timestamp};
use super::DbPool;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Malformed member document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("Member {member_id} not found on server {server_id}")]
    RecordNotFound { server_id: String, member_id: String },
}

#[derive(Debug, Clone)]
pub struct ActivityStore {
    pool: DbPool,
}

impl ActivityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Looks up a member's document without creating it.
    pub async fn find(
        &self,
        server_id: &str,
        member_id: &str,
    ) -> Result<Option<MemberRecord>, StoreError> {
        let document: Option<String> = sqlx::query_scalar(
            "SELECT document FROM members WHERE guild_id = ? AND member_id = ?",
        )
        .bind(server_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document
            .map(|document| MemberRecord::from_document(server_id, &document))
            .transpose()?)
    }

    /// Returns the member's document, creating an empty one on first contact.
    ///
    /// Creation is an insert-if-absent on the (server, member) key, so two
    /// concurrent first contacts still end up with a single document.
    pub async fn get_or_create(
        &self,
        server_id: &str,
        member_id: &str,
        username: &str,
    ) -> Result<MemberRecord, StoreError> {
        let fresh = MemberRecord::new(server_id, member_id, username, Timestamp::now());

        let inserted = sqlx::query(
            r#"
            INSERT INTO members (guild_id, member_id, document)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id, member_id) DO NOTHING
            "#,
        )
        .bind(server_id)
        .bind(member_id)
        .bind(fresh.to_document()?)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            info!("Created activity record for {} ({}) on server {}", username, member_id, server_id);
            return Ok(fresh);
        }

        self.find(server_id, member_id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound {
                server_id: server_id.to_owned(),
                member_id: member_id.to_owned(),
            })
    }

    /// Persists one append to a member's document.
    pub async fn apply_update(
        &self,
        server_id: &str,
        record_id: &str,
        update: &MemberUpdate,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET document = json_insert(document, ?, json(?))
            WHERE guild_id = ? AND member_id = ?
            "#,
        )
        .bind(update.path())
        .bind(update.payload()?)
        .bind(server_id)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound {
                server_id: server_id.to_owned(),
                member_id: record_id.to_owned(),
            });
        }

        debug!("Appended {} for member {} on server {}", update.path(), record_id, server_id);
        Ok(())
    }

    async fn push(&self, record: &mut MemberRecord, update: MemberUpdate) -> Result<(), StoreError> {
        self.apply_update(&record.server_id, &record.id, &update).await?;
        update.apply_to(record);
        Ok(())
    }

    pub async fn record_connection(&self, record: &mut MemberRecord) -> Result<(), StoreError> {
        self.push(record, MemberUpdate::Connection(Timestamp::now())).await
    }

    pub async fn record_disconnection(&self, record: &mut MemberRecord) -> Result<(), StoreError> {
        self.push(record, MemberUpdate::Disconnection(Timestamp::now())).await
    }

    pub async fn record_afk_enter(&self, record: &mut MemberRecord) -> Result<(), StoreError> {
        self.push(record, MemberUpdate::AfkEntrance(Timestamp::now())).await
    }

    pub async fn record_afk_exit(&self, record: &mut MemberRecord) -> Result<(), StoreError> {
        self.push(record, MemberUpdate::AfkExit(Timestamp::now())).await
    }

    /// Stores `text` exactly as sent.
    pub async fn record_message(
        &self,
        record: &mut MemberRecord,
        text: &str,
    ) -> Result<(), StoreError> {
        let entry = MessageEntry {
            sent: Timestamp::now(),
            text: text.to_owned(),
        };
        self.push(record, MemberUpdate::Message(entry)).await
    }
}
