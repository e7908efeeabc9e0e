//! Access control state machine for a PortalBox.
//!
//! The [`AccessController`] sequences badge reads, directory lookups, relay
//! activation, session timeouts and fault handling for one piece of shared
//! equipment. It owns its peripherals and talks to them only through the
//! `portalbox-hardware` and `portalbox-core` traits, so the same controller
//! drives real hardware, the simulator and the tests.
//!
//! # Safety rule
//!
//! The equipment relay is energized if and only if the controller is
//! [`StateKind::Active`]. Relay commands are issued from a single transition
//! function; any hardware fault forces the relay off and locks the box out
//! until [`AccessController::clear_fault`] succeeds.

pub mod config;
pub mod controller;
pub mod feedback;
pub mod logger;
pub mod mock;
pub mod retry;
pub mod session;
pub mod state;

pub use config::{ControllerConfig, NotificationTemplates};
pub use controller::{AccessController, ControllerHandle};
pub use feedback::{FeedbackKind, FeedbackSequence, FeedbackSequencer, FeedbackStep, FeedbackTheme};
pub use logger::TracingEventLogger;
pub use retry::{AuthorizationOutcome, RetryPolicy, authorize_with_retry};
pub use session::{Session, SessionEnd, SessionPhase};
pub use state::{ControllerState, MAX_HISTORY_SIZE, StateKind, StateMachine, StateTransition};
