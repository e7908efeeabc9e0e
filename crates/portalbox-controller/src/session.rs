//! An authorized use of the equipment.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use portalbox_core::{AccessEvent, Badge, EquipmentPolicy};
use tokio::time::Instant;
use uuid::Uuid;

/// Why a session ended on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEnd {
    /// Badge out of the reader for the debounce window, or the button was
    /// pressed while it was out.
    Removed,

    /// No activity for the policy's idle timeout.
    IdleTimeout,

    /// Maximum session length reached.
    MaxDuration,
}

impl SessionEnd {
    pub fn event(&self) -> AccessEvent {
        match self {
            Self::Removed => AccessEvent::SessionEndedRemoved,
            Self::IdleTimeout => AccessEvent::SessionEndedTimeout,
            Self::MaxDuration => AccessEvent::SessionEndedMaxDuration,
        }
    }

    /// Whether the session ran out of time (as opposed to being ended by the user).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::IdleTimeout | Self::MaxDuration)
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed => write!(f, "badge removed"),
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::MaxDuration => write!(f, "maximum duration reached"),
        }
    }
}

/// What the session should currently look like to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Running,

    /// Badge not seen on the latest poll.
    BadgeMissing,

    /// A time limit is within the warning window.
    TimeoutWarning,
}

/// The one authorized use of the equipment, if any.
///
/// Timers use the monotonic clock; `started_wall` is only for audit records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    badge: Badge,
    policy: EquipmentPolicy,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    last_activity: Instant,
    last_seen: Instant,
    phase: SessionPhase,
}

impl Session {
    pub fn start(badge: Badge, policy: EquipmentPolicy, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            badge,
            policy,
            started_at: now,
            started_wall: Utc::now(),
            last_activity: now,
            last_seen: now,
            phase: SessionPhase::Running,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn badge(&self) -> Badge {
        self.badge
    }

    pub fn policy(&self) -> &EquipmentPolicy {
        &self.policy
    }

    pub fn started_wall(&self) -> DateTime<Utc> {
        self.started_wall
    }

    /// Phase last shown to the user.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    /// The session badge was read.
    pub fn mark_seen(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// The activity signal fired.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn missing_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Whether the badge went unseen on the latest poll.
    pub fn is_badge_missing(&self, now: Instant) -> bool {
        self.last_seen < now
    }

    /// Time left before the nearest enabled limit, if any limit is enabled.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let until_max = self
            .policy
            .has_max_session()
            .then(|| self.policy.max_session.saturating_sub(self.elapsed(now)));
        let until_idle = self
            .policy
            .has_idle_timeout()
            .then(|| self.policy.idle_timeout.saturating_sub(self.idle_for(now)));
        match (until_max, until_idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether the session must end now, and why.
    ///
    /// The maximum duration wins over the idle timeout, which wins over
    /// removal, so that the audit record names the limit that applied.
    pub fn check_expiry(&self, now: Instant, debounce: Duration) -> Option<SessionEnd> {
        if self.policy.has_max_session() && self.elapsed(now) > self.policy.max_session {
            return Some(SessionEnd::MaxDuration);
        }
        if self.policy.has_idle_timeout() && self.idle_for(now) > self.policy.idle_timeout {
            return Some(SessionEnd::IdleTimeout);
        }
        if self.missing_for(now) >= debounce {
            return Some(SessionEnd::Removed);
        }
        None
    }

    /// Phase the user should be seeing at `now`.
    pub fn phase_at(&self, now: Instant, warning_window: Duration) -> SessionPhase {
        if self.is_badge_missing(now) {
            return SessionPhase::BadgeMissing;
        }
        match self.remaining(now) {
            Some(remaining) if !warning_window.is_zero() && remaining <= warning_window => {
                SessionPhase::TimeoutWarning
            }
            _ => SessionPhase::Running,
        }
    }
}
