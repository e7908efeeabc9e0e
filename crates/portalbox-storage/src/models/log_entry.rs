use chrono::{DateTime, Utc};
use portalbox_core::AccessEvent;
use serde::{Deserialize, Serialize};

/// One row of the audit `log` table, with the event type resolved to its
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub event: String,
    pub equipment_id: Option<i64>,
    pub card_id: Option<i64>,
    pub state: String,
    pub detail: Option<String>,
    pub message: Option<String>,
}

impl LogEntry {
    /// Event payload worth keeping next to the event name, if any.
    pub fn detail_for(event: &AccessEvent) -> Option<String> {
        match event {
            AccessEvent::AccessDenied { reason } => Some(match reason {
                portalbox_core::DenialReason::Other(text) => format!("other: {text}"),
                reason => reason.code().to_string(),
            }),
            AccessEvent::AuthorizationUnreachable { attempts } => {
                Some(format!("attempts={attempts}"))
            }
            AccessEvent::HardwareFault { detail } => Some(detail.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portalbox_core::DenialReason;

    #[test]
    fn test_detail_for_payload_events() {
        assert_eq!(
            LogEntry::detail_for(&AccessEvent::AccessDenied {
                reason: DenialReason::InsufficientBalance
            })
            .as_deref(),
            Some("insufficient_balance")
        );
        assert_eq!(
            LogEntry::detail_for(&AccessEvent::AccessDenied {
                reason: DenialReason::Other("locked".into())
            })
            .as_deref(),
            Some("other: locked")
        );
        assert_eq!(
            LogEntry::detail_for(&AccessEvent::AuthorizationUnreachable { attempts: 3 })
                .as_deref(),
            Some("attempts=3")
        );
        assert_eq!(LogEntry::detail_for(&AccessEvent::AccessGranted), None);
    }
}
