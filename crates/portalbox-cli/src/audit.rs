//! Audit trail selection.

use portalbox_controller::TracingEventLogger;
use portalbox_core::{AccessEvent, EventContext, EventLogger};
use portalbox_storage::SqliteEventLog;

/// Where audit events go: always the diagnostic log, plus the database
/// `log` table unless disabled.
pub enum AuditLog {
    Database((SqliteEventLog, TracingEventLogger)),
    Tracing(TracingEventLogger),
}

impl AuditLog {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Database(..) => "database+tracing",
            Self::Tracing(_) => "tracing",
        }
    }
}

impl EventLogger for AuditLog {
    async fn record(&mut self, event: &AccessEvent, context: &EventContext) {
        match self {
            Self::Database(pair) => pair.record(event, context).await,
            Self::Tracing(tracing) => tracing.record(event, context).await,
        }
    }
}
