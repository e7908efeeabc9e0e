#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::LogEntry;
use portalbox_core::{AccessEvent, EventContext};
use sqlx::SqlitePool;

/// Append-only access to the audit `log` table.
pub trait EventLogRepository: Send + Sync {
    /// Insert one event and return the row id.
    async fn append(
        &self,
        event: &AccessEvent,
        context: &EventContext,
        equipment_id: Option<i64>,
    ) -> StorageResult<i64>;

    /// Most recent entries, newest first.
    async fn recent(&self, limit: u32) -> StorageResult<Vec<LogEntry>>;

    async fn count_by_event(&self, event_name: &str) -> StorageResult<i64>;
}

/// SQLite implementation of EventLogRepository
pub struct SqliteEventLogRepository {
    pool: SqlitePool,
}

impl SqliteEventLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventLogRepository for SqliteEventLogRepository {
    async fn append(
        &self,
        event: &AccessEvent,
        context: &EventContext,
        equipment_id: Option<i64>,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO log (time, event_type_id, equipment_id, card_id, state, detail, message)
            SELECT ?, id, ?, ?, ?, ?, ?
            FROM event_types
            WHERE name = ?
            "#,
        )
        .bind(context.timestamp)
        .bind(equipment_id)
        .bind(context.badge.map(|badge| i64::from(badge.card_id())))
        .bind(&context.state)
        .bind(LogEntry::detail_for(event))
        .bind(context.message.as_deref())
        .bind(event.name())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("event_type", "name", event.name()));
        }
        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: u32) -> StorageResult<Vec<LogEntry>> {
        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT l.id, l.time, t.name AS event, l.equipment_id, l.card_id,
                   l.state, l.detail, l.message
            FROM log l
            JOIN event_types t ON l.event_type_id = t.id
            ORDER BY l.id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn count_by_event(&self, event_name: &str) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM log l
            JOIN event_types t ON l.event_type_id = t.id
            WHERE t.name = ?
            "#,
        )
        .bind(event_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
