//! Audit trail written to `tracing`.

use portalbox_core::{AccessEvent, EventContext, EventLogger};
use tracing::{info, warn};

/// Records access events as structured `tracing` events under the
/// `portalbox::audit` target.
///
/// Used on its own when no database is configured, and paired with the
/// database log otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    async fn record(&mut self, event: &AccessEvent, context: &EventContext) {
        let badge = context.badge.map(|badge| badge.to_hex());
        if event.is_notification() {
            warn!(
                target: "portalbox::audit",
                event = event.name(),
                state = %context.state,
                badge = badge.as_deref(),
                equipment = context.equipment.as_deref(),
                message = context.message.as_deref(),
                "{event}"
            );
        } else {
            info!(
                target: "portalbox::audit",
                event = event.name(),
                state = %context.state,
                badge = badge.as_deref(),
                equipment = context.equipment.as_deref(),
                "{event}"
            );
        }
    }
}
