//! Audit events emitted by the access controller.
//!
//! Every state transition of the controller produces exactly one
//! [`AccessEvent`], accompanied by an [`EventContext`] describing where the
//! controller was when it happened. Events are handed to an
//! [`EventLogger`](crate::EventLogger), which records them on a best-effort
//! basis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Badge, DenialReason};

/// Something that happened at the box and belongs in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccessEvent {
    /// The controller started its control loop.
    Started,

    /// A badge was read while idle and is being authorized.
    BadgePresented,

    /// The directory granted the badge; the relay is energized.
    AccessGranted,

    /// The directory refused the badge.
    AccessDenied { reason: DenialReason },

    /// Every authorization attempt failed to reach the directory.
    AuthorizationUnreachable { attempts: u32 },

    /// The session badge stayed out of the reader for the debounce window.
    SessionEndedRemoved,

    /// No activity was seen within the policy idle timeout.
    SessionEndedTimeout,

    /// The session ran past the policy maximum duration.
    SessionEndedMaxDuration,

    /// The session was cut short by a shutdown request.
    SessionEndedShutdown,

    /// A session timed out while its badge was still in the reader.
    ///
    /// This is a notification for the card holder, not a state change.
    CardLeftInReader,

    /// An actuator or sensor failed; the box is locked out.
    HardwareFault { detail: String },

    /// The lockout was cleared by an external reset.
    FaultCleared,

    /// The controller is shutting down; the relay is off.
    Shutdown,
}

impl AccessEvent {
    /// Stable snake_case identifier for this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::BadgePresented => "badge_presented",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied { .. } => "access_denied",
            Self::AuthorizationUnreachable { .. } => "authorization_unreachable",
            Self::SessionEndedRemoved => "session_ended_removed",
            Self::SessionEndedTimeout => "session_ended_timeout",
            Self::SessionEndedMaxDuration => "session_ended_max_duration",
            Self::SessionEndedShutdown => "session_ended_shutdown",
            Self::CardLeftInReader => "card_left_in_reader",
            Self::HardwareFault { .. } => "hardware_fault",
            Self::FaultCleared => "fault_cleared",
            Self::Shutdown => "shutdown",
        }
    }

    /// Whether this event ends an active session.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::SessionEndedRemoved
                | Self::SessionEndedTimeout
                | Self::SessionEndedMaxDuration
                | Self::SessionEndedShutdown
        )
    }

    /// Whether this event should be forwarded to the card holder.
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::CardLeftInReader)
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied { reason } => write!(f, "{}: {reason}", self.name()),
            Self::AuthorizationUnreachable { attempts } => {
                write!(f, "{} after {attempts} attempts", self.name())
            }
            Self::HardwareFault { detail } => write!(f, "{}: {detail}", self.name()),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Where and when an event happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Wall-clock time of the event.
    pub timestamp: DateTime<Utc>,

    /// Controller state entered by the transition (e.g. `"Idle"`).
    pub state: String,

    /// Badge involved, if any.
    pub badge: Option<Badge>,

    /// Equipment name, once known.
    pub equipment: Option<String>,

    /// Rendered human-readable message for notification events.
    pub message: Option<String>,
}

impl EventContext {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            state: state.into(),
            badge: None,
            equipment: None,
            message: None,
        }
    }

    pub fn with_badge(mut self, badge: Badge) -> Self {
        self.badge = Some(badge);
        self
    }

    pub fn with_equipment(mut self, equipment: impl Into<String>) -> Self {
        self.equipment = Some(equipment.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
