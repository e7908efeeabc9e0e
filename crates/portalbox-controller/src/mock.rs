//! In-memory directory and audit log for tests and the simulator.
//!
//! Both follow the hardware mocks: the device half is handed to the
//! controller, the handle half stays with the caller to script and observe it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use portalbox_core::{
    AccessEvent, AuthorizationClient, AuthorizationResult, Badge, DenialReason, EquipmentPolicy,
    EventContext, EventLogger,
};

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct DirectoryState {
    /// Standing answer per badge.
    answers: HashMap<Badge, AuthorizationResult>,

    /// One-shot answers consumed before the standing answer.
    queued: HashMap<Badge, VecDeque<AuthorizationResult>>,

    /// Simulated directory latency.
    delay: Option<Duration>,

    calls: Vec<Badge>,
}

/// Directory whose answers are scripted per badge.
///
/// Badges without a script are denied as unknown cards.
#[derive(Debug)]
pub struct ScriptedAuthorizer {
    state: Arc<Mutex<DirectoryState>>,
}

impl ScriptedAuthorizer {
    pub fn new() -> (Self, ScriptedAuthorizerHandle) {
        let state = Arc::new(Mutex::new(DirectoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            ScriptedAuthorizerHandle { state },
        )
    }
}

impl AuthorizationClient for ScriptedAuthorizer {
    async fn authorize(&mut self, badge: &Badge) -> AuthorizationResult {
        let delay = {
            let mut state = lock(&self.state);
            state.calls.push(*badge);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        if let Some(next) = state.queued.get_mut(badge).and_then(VecDeque::pop_front) {
            return next;
        }
        state
            .answers
            .get(badge)
            .cloned()
            .unwrap_or(AuthorizationResult::denied(DenialReason::UnknownCard))
    }
}

/// Handle for scripting a [`ScriptedAuthorizer`].
#[derive(Debug, Clone)]
pub struct ScriptedAuthorizerHandle {
    state: Arc<Mutex<DirectoryState>>,
}

impl ScriptedAuthorizerHandle {
    pub fn set_granted(&self, badge: Badge, policy: EquipmentPolicy) {
        lock(&self.state)
            .answers
            .insert(badge, AuthorizationResult::granted(policy));
    }

    pub fn set_denied(&self, badge: Badge, reason: DenialReason) {
        lock(&self.state)
            .answers
            .insert(badge, AuthorizationResult::denied(reason));
    }

    pub fn set_unreachable(&self, badge: Badge) {
        lock(&self.state)
            .answers
            .insert(badge, AuthorizationResult::Unreachable);
    }

    /// Answer the next lookups of `badge` with `results`, in order.
    pub fn queue(&self, badge: Badge, results: impl IntoIterator<Item = AuthorizationResult>) {
        lock(&self.state)
            .queued
            .entry(badge)
            .or_default()
            .extend(results);
    }

    /// Make every lookup take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    /// Number of lookups so far.
    pub fn calls(&self) -> usize {
        lock(&self.state).calls.len()
    }

    /// Badges looked up so far, in order.
    pub fn looked_up(&self) -> Vec<Badge> {
        lock(&self.state).calls.clone()
    }
}

/// Audit log kept in memory.
#[derive(Debug)]
pub struct MemoryEventLogger {
    records: Arc<Mutex<Vec<(AccessEvent, EventContext)>>>,
}

impl MemoryEventLogger {
    pub fn new() -> (Self, MemoryEventLog) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: Arc::clone(&records),
            },
            MemoryEventLog { records },
        )
    }
}

impl EventLogger for MemoryEventLogger {
    async fn record(&mut self, event: &AccessEvent, context: &EventContext) {
        lock(&self.records).push((event.clone(), context.clone()));
    }
}

/// Read side of a [`MemoryEventLogger`].
#[derive(Debug, Clone)]
pub struct MemoryEventLog {
    records: Arc<Mutex<Vec<(AccessEvent, EventContext)>>>,
}

impl MemoryEventLog {
    pub fn events(&self) -> Vec<AccessEvent> {
        lock(&self.records)
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<(AccessEvent, EventContext)> {
        lock(&self.records).clone()
    }

    /// Event names in the order they were recorded.
    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.records)
            .iter()
            .map(|(event, _)| event.name())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        lock(&self.records)
            .iter()
            .any(|(event, _)| event.name() == name)
    }

    pub fn count(&self, name: &str) -> usize {
        lock(&self.records)
            .iter()
            .filter(|(event, _)| event.name() == name)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const B1: Badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);
    const B2: Badge = Badge::new([0x01, 0x02, 0x03, 0x04]);

    #[tokio::test]
    async fn test_unscripted_badge_is_unknown() {
        let (mut directory, handle) = ScriptedAuthorizer::new();
        assert_eq!(
            directory.authorize(&B2).await,
            AuthorizationResult::denied(DenialReason::UnknownCard)
        );
        assert_eq!(handle.looked_up(), vec![B2]);
    }

    #[tokio::test]
    async fn test_queued_answers_precede_standing_answer() {
        let (mut directory, handle) = ScriptedAuthorizer::new();
        handle.set_granted(B1, EquipmentPolicy::unlimited("Mill"));
        handle.queue(B1, [AuthorizationResult::Unreachable]);

        assert!(directory.authorize(&B1).await.is_unreachable());
        assert!(directory.authorize(&B1).await.is_granted());
        assert!(directory.authorize(&B1).await.is_granted());
        assert_eq!(handle.calls(), 3);
    }

    #[tokio::test]
    async fn test_memory_log_records_in_order() {
        let (mut logger, log) = MemoryEventLogger::new();
        let context = EventContext::new("idle");
        logger.record(&AccessEvent::Started, &context).await;
        logger.record(&AccessEvent::BadgePresented, &context).await;

        assert_eq!(log.names(), vec!["started", "badge_presented"]);
        assert!(log.contains("started"));
        assert_eq!(log.count("shutdown"), 0);
    }
}
