//! Controller state and transition rules.
//!
//! # States
//!
//! - `Idle`: waiting for a badge
//! - `Authorizing`: directory lookup for a presented badge
//! - `Active`: session running, relay energized
//! - `FaultLockout`: hardware fault, relay forced off, badges ignored
//! - `ShuttingDown`: terminal, relay forced off
//!
//! # Valid Transitions
//!
//! - Idle → Authorizing → Active/Idle
//! - Active → Idle
//! - FaultLockout → Idle (fault cleared)
//! - any non-terminal state → FaultLockout/ShuttingDown
//!
//! # Examples
//!
//! ```
//! use portalbox_controller::{StateKind, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.kind(), StateKind::Idle);
//! assert!(machine.state().kind().can_transition_to(StateKind::Authorizing));
//! assert!(!StateKind::Idle.can_transition_to(StateKind::Active));
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use portalbox_core::{Badge, Error, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::session::Session;

/// Maximum number of state transitions to keep in history.
///
/// A full session is three transitions (Authorizing, Active, Idle), so this
/// covers roughly the last thirty sessions.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Controller state, carrying the data that only exists in that state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Authorizing(Badge),
    Active(Session),
    ShuttingDown,
    FaultLockout,
}

impl ControllerState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Authorizing(_) => StateKind::Authorizing,
            Self::Active(_) => StateKind::Active,
            Self::ShuttingDown => StateKind::ShuttingDown,
            Self::FaultLockout => StateKind::FaultLockout,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            Self::Active(session) => Some(session),
            _ => None,
        }
    }

    /// Badge being authorized or in session.
    pub fn badge(&self) -> Option<Badge> {
        match self {
            Self::Authorizing(badge) => Some(*badge),
            Self::Active(session) => Some(session.badge()),
            _ => None,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

/// State without its payload; what history and audit records store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Authorizing,
    Active,
    ShuttingDown,
    FaultLockout,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            StateKind::Idle => "Idle",
            StateKind::Authorizing => "Authorizing",
            StateKind::Active => "Active",
            StateKind::ShuttingDown => "ShuttingDown",
            StateKind::FaultLockout => "FaultLockout",
        };
        write!(f, "{}", state_str)
    }
}

impl StateKind {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use portalbox_controller::StateKind;
    ///
    /// assert!(StateKind::Active.can_transition_to(StateKind::FaultLockout));
    /// assert!(!StateKind::ShuttingDown.can_transition_to(StateKind::Idle));
    /// ```
    pub fn can_transition_to(&self, target: StateKind) -> bool {
        matches!(
            (self, target),
            // From Idle
            (StateKind::Idle, StateKind::Authorizing)
            // From Authorizing
            | (StateKind::Authorizing, StateKind::Active | StateKind::Idle)
            // From Active
            | (StateKind::Active, StateKind::Idle)
            // From FaultLockout
            | (StateKind::FaultLockout, StateKind::Idle)
            // Faults and shutdown preempt everything but shutdown
            | (
                StateKind::Idle | StateKind::Authorizing | StateKind::Active,
                StateKind::FaultLockout
            )
            | (
                StateKind::Idle
                    | StateKind::Authorizing
                    | StateKind::Active
                    | StateKind::FaultLockout,
                StateKind::ShuttingDown
            )
        )
    }

    /// Relay state this state requires.
    pub fn relay_energized(&self) -> bool {
        matches!(self, StateKind::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StateKind::ShuttingDown)
    }
}

/// A single state transition with its cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: StateKind,
    pub to: StateKind,

    /// Name of the access event that caused the transition.
    pub cause: String,

    /// When the transition occurred.
    ///
    /// Not serialized; set to the time of deserialization.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: StateKind, to: StateKind, cause: impl Into<String>) -> Self {
        Self {
            from,
            to,
            cause: cause.into(),
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Current state plus a bounded history of how it got there.
#[derive(Debug)]
pub struct StateMachine {
    current: ControllerState,
    entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: ControllerState::Idle,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.current
    }

    /// Mutable access for updating the session in place.
    pub fn state_mut(&mut self) -> &mut ControllerState {
        &mut self.current
    }

    pub fn kind(&self) -> StateKind {
        self.current.kind()
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Move to `next`, validating the transition.
    ///
    /// Returns the state that was left.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] without changing anything if
    /// the transition is not allowed.
    pub fn transition_to(
        &mut self,
        next: ControllerState,
        cause: &str,
    ) -> Result<(ControllerState, StateTransition)> {
        let from = self.current.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let transition = StateTransition::new(from, to, cause);
        let previous = std::mem::replace(&mut self.current, next);
        self.entered_at = transition.timestamp;
        self.add_to_history(transition.clone());
        Ok((previous, transition))
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
