//! Capabilities the access controller consumes from the outside world.
//!
//! Hardware capabilities live in `portalbox-hardware`; the two traits here
//! cover the directory that decides who may use the equipment and the audit
//! trail that records what happened.
//!
//! Both traits use native `async fn` methods (Edition 2024 RPITIT). They are
//! not object-safe; the controller takes them as generic parameters.

#![allow(async_fn_in_trait)]

use crate::events::{AccessEvent, EventContext};
use crate::types::{AuthorizationResult, Badge};

/// Directory that decides whether a badge may use this equipment.
///
/// Implementations should map every transport or database failure to
/// [`AuthorizationResult::Unreachable`]; they must never turn a failure into
/// `Granted`. The controller bounds each call with its own timeout and
/// treats an overdue call as `Unreachable`, so implementations need not.
///
/// # Examples
///
/// ```
/// use portalbox_core::{AuthorizationClient, AuthorizationResult, Badge, DenialReason, EquipmentPolicy};
///
/// struct AllowList(Vec<Badge>);
///
/// impl AuthorizationClient for AllowList {
///     async fn authorize(&mut self, badge: &Badge) -> AuthorizationResult {
///         if self.0.contains(badge) {
///             AuthorizationResult::granted(EquipmentPolicy::unlimited("Drill Press"))
///         } else {
///             AuthorizationResult::denied(DenialReason::UnknownCard)
///         }
///     }
/// }
/// ```
pub trait AuthorizationClient: Send + Sync {
    /// Look up the badge and return the directory's decision.
    async fn authorize(&mut self, badge: &Badge) -> AuthorizationResult;
}

/// Best-effort audit trail.
///
/// Recording never fails from the caller's point of view: implementations
/// report their own errors (typically via `tracing`) and swallow them, so
/// that logging can never influence an access decision.
pub trait EventLogger: Send + Sync {
    /// Record an event.
    async fn record(&mut self, event: &AccessEvent, context: &EventContext);
}

/// Event logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventLogger;

impl EventLogger for NullEventLogger {
    async fn record(&mut self, _event: &AccessEvent, _context: &EventContext) {}
}

/// A pair of loggers records every event to both, first to second.
impl<A: EventLogger, B: EventLogger> EventLogger for (A, B) {
    async fn record(&mut self, event: &AccessEvent, context: &EventContext) {
        self.0.record(event, context).await;
        self.1.record(event, context).await;
    }
}
