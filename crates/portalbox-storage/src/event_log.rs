//! Audit trail written to the database `log` table.

use crate::connection::Database;
use crate::repositories::{EventLogRepository, SqliteEventLogRepository};
use portalbox_core::{AccessEvent, EventContext, EventLogger};
use tracing::warn;

/// [`EventLogger`] that appends every event to the `log` table for one box.
///
/// Write failures are reported with `tracing::warn!` and dropped.
pub struct SqliteEventLog<R = SqliteEventLogRepository> {
    repository: R,
    equipment_id: Option<i64>,
}

impl SqliteEventLog {
    pub fn new(db: &Database, equipment_id: Option<i64>) -> Self {
        Self::with_repository(SqliteEventLogRepository::new(db.pool().clone()), equipment_id)
    }
}

impl<R: EventLogRepository> SqliteEventLog<R> {
    pub fn with_repository(repository: R, equipment_id: Option<i64>) -> Self {
        Self {
            repository,
            equipment_id,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R: EventLogRepository> EventLogger for SqliteEventLog<R> {
    async fn record(&mut self, event: &AccessEvent, context: &EventContext) {
        if let Err(err) = self
            .repository
            .append(event, context, self.equipment_id)
            .await
        {
            warn!(event = event.name(), error = %err, "Failed to write audit log entry");
        }
    }
}
