//! The access controller: one box, one piece of equipment, one session at a time.
//!
//! [`AccessController::tick`] performs one step of the control loop: poll the
//! reader, run the state-specific logic, then play any feedback that has come
//! due. [`AccessController::run`] calls it at the configured poll interval
//! until shutdown.
//!
//! Every state change goes through a single transition function, which is
//! also the only place the relay is commanded. The relay is energized exactly
//! while the controller is `Active`.
//!
//! Every device call is bounded by the configured output timeout. A device
//! that stalls is treated as faulted, so a tick always returns.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use portalbox_core::{
    AccessEvent, AuthorizationClient, AuthorizationResult, Badge, Error, EventContext, EventLogger,
    Result,
};
use portalbox_hardware::{ActivityInput, CardReader, HardwareError, OutputDevice};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ControllerConfig;
use crate::feedback::{FeedbackKind, FeedbackSequencer, FeedbackStep};
use crate::retry::{AuthorizationOutcome, authorize_with_retry};
use crate::session::{Session, SessionEnd, SessionPhase};
use crate::state::{ControllerState, StateKind, StateMachine, StateTransition};

/// Cross-task control of a running [`AccessController`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    shutdown: CancellationToken,
    reset_requested: Arc<AtomicBool>,
}

impl ControllerHandle {
    /// Ask the controller to shut down. Takes effect on the next tick, and
    /// interrupts a directory lookup or backoff in progress.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Ask the controller to leave fault lockout on its next tick.
    pub fn request_fault_reset(&self) {
        self.reset_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Equipment access controller.
///
/// Owns every capability it uses: card reader `R`, activity button `B`,
/// output stage `O`, directory `A` and audit log `L`.
///
/// # Examples
///
/// ```
/// use portalbox_controller::{AccessController, ControllerConfig, StateKind};
/// use portalbox_controller::mock::{MemoryEventLogger, ScriptedAuthorizer};
/// use portalbox_core::{Badge, EquipmentPolicy};
/// use portalbox_hardware::mock::{MockButton, MockCardReader, MockOutputDevice};
///
/// #[tokio::main]
/// async fn main() -> portalbox_core::Result<()> {
///     let (reader, card) = MockCardReader::new();
///     let (button, _button) = MockButton::new();
///     let (outputs, observed) = MockOutputDevice::new();
///     let (directory, script) = ScriptedAuthorizer::new();
///     let (logger, _log) = MemoryEventLogger::new();
///
///     let badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);
///     script.set_granted(badge, EquipmentPolicy::unlimited("Laser Cutter"));
///
///     let mut controller = AccessController::new(
///         ControllerConfig::default(), reader, button, outputs, directory, logger,
///     )?;
///     controller.start().await;
///
///     card.present(badge);
///     assert_eq!(controller.tick().await, StateKind::Active);
///     assert!(observed.relay_energized());
///     Ok(())
/// }
/// ```
pub struct AccessController<R, B, O, A, L> {
    config: ControllerConfig,
    reader: R,
    button: B,
    outputs: O,
    authorizer: A,
    logger: L,
    machine: StateMachine,

    /// Relay state as last confirmed by the output stage.
    relay_energized: bool,

    feedback: FeedbackSequencer,

    /// Badge that must leave the reader before it is considered again.
    ignored_badge: Option<Badge>,

    /// When the ignored badge was last seen missing from the reader.
    ignored_absent_since: Option<Instant>,

    /// Name from the most recent grant, if any.
    equipment_name: Option<String>,

    fault_detail: Option<String>,
    shutdown: CancellationToken,
    reset_requested: Arc<AtomicBool>,
}

impl<R, B, O, A, L> AccessController<R, B, O, A, L>
where
    R: CardReader,
    B: ActivityInput,
    O: OutputDevice,
    A: AuthorizationClient,
    L: EventLogger,
{
    /// Create a controller in `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` does not validate.
    pub fn new(
        config: ControllerConfig,
        reader: R,
        button: B,
        outputs: O,
        authorizer: A,
        logger: L,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reader,
            button,
            outputs,
            authorizer,
            logger,
            machine: StateMachine::new(),
            relay_energized: false,
            feedback: FeedbackSequencer::new(),
            ignored_badge: None,
            ignored_absent_since: None,
            equipment_name: None,
            fault_detail: None,
            shutdown: CancellationToken::new(),
            reset_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Use an externally owned shutdown token, e.g. one cancelled by a signal handler.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            shutdown: self.shutdown.clone(),
            reset_requested: Arc::clone(&self.reset_requested),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        self.machine.state()
    }

    pub fn kind(&self) -> StateKind {
        self.machine.kind()
    }

    pub fn session(&self) -> Option<&Session> {
        self.machine.state().session()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.machine.history().iter().cloned().collect()
    }

    /// Relay state as last confirmed by the output stage.
    pub fn relay_energized(&self) -> bool {
        self.relay_energized
    }

    /// Badge being ignored until it leaves the reader.
    pub fn ignored_badge(&self) -> Option<Badge> {
        self.ignored_badge
    }

    /// What caused the current lockout.
    pub fn fault_detail(&self) -> Option<&str> {
        self.fault_detail.as_deref()
    }

    /// Feedback sequence started last.
    pub fn feedback(&self) -> Option<FeedbackKind> {
        self.feedback.current()
    }

    fn equipment_name(&self) -> Option<&str> {
        self.equipment_name
            .as_deref()
            .or(self.config.equipment_name.as_deref())
    }

    /// Announce the controller and show idle feedback.
    pub async fn start(&mut self) {
        info!(
            equipment = self.equipment_name().unwrap_or("unknown"),
            poll_interval = ?self.config.poll_interval(),
            "PortalBox controller started"
        );
        let now = Instant::now();
        self.feedback
            .begin(self.config.feedback.sequence(FeedbackKind::Idle), now);
        self.record(&AccessEvent::Started, None, None).await;
        self.advance_feedback(now).await;
    }

    /// Run one step of the control loop and return the resulting state.
    pub async fn tick(&mut self) -> StateKind {
        if self.shutdown.is_cancelled() && !self.machine.kind().is_terminal() {
            self.shutdown().await;
            return self.machine.kind();
        }

        let now = Instant::now();
        match self.machine.kind() {
            StateKind::Idle => self.tick_idle(now).await,
            StateKind::Authorizing => self.authorize_pending().await,
            StateKind::Active => self.tick_active(now).await,
            StateKind::FaultLockout => {
                if self.reset_requested.swap(false, Ordering::SeqCst) {
                    self.clear_fault().await;
                }
            }
            StateKind::ShuttingDown => {}
        }

        self.advance_feedback(Instant::now()).await;
        self.machine.kind()
    }

    /// Call [`tick`](Self::tick) every poll interval until shut down.
    pub async fn run(&mut self) -> StateKind {
        self.run_with(|_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_tick` with the state after every tick.
    pub async fn run_with<F: FnMut(StateKind)>(&mut self, mut on_tick: F) -> StateKind {
        self.start().await;

        let shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.cancelled() => {}
            }
            let state = self.tick().await;
            on_tick(state);
            if state.is_terminal() {
                break;
            }
        }

        info!("PortalBox controller stopped");
        self.machine.kind()
    }

    /// Leave fault lockout.
    ///
    /// Succeeds only if the output stage confirms the relay off. Returns
    /// whether the controller is now `Idle`.
    pub async fn clear_fault(&mut self) -> bool {
        if self.machine.kind() != StateKind::FaultLockout {
            return false;
        }

        match self
            .transition(ControllerState::Idle, AccessEvent::FaultCleared, FeedbackKind::Idle)
            .await
        {
            Ok(()) => {
                info!(
                    previous_fault = self.fault_detail.as_deref().unwrap_or("unknown"),
                    "Fault cleared"
                );
                self.fault_detail = None;
                self.release_ignored_badge();
                self.advance_feedback(Instant::now()).await;
                self.machine.kind() == StateKind::Idle
            }
            Err(err) => {
                warn!(error = %err, "Fault not cleared");
                false
            }
        }
    }

    /// Force the relay off and enter the terminal `ShuttingDown` state.
    pub async fn shutdown(&mut self) {
        if self.machine.kind().is_terminal() {
            return;
        }
        self.shutdown.cancel();
        info!(state = %self.machine.kind(), "Shutting down");

        let session_badge = self.machine.state().session().map(Session::badge);
        if let Some(badge) = session_badge {
            self.record(&AccessEvent::SessionEndedShutdown, Some(badge), None)
                .await;
        }
        if let Err(err) = self
            .transition(
                ControllerState::ShuttingDown,
                AccessEvent::Shutdown,
                FeedbackKind::ShuttingDown,
            )
            .await
        {
            error!(error = %err, "Shutdown transition failed");
        }
        self.advance_feedback(Instant::now()).await;
    }

    async fn tick_idle(&mut self, now: Instant) {
        let limit = self.config.output_timeout();
        let polled = match bounded(limit, self.reader.poll()).await {
            Ok(polled) => polled,
            Err(err) => return self.lockout(format!("card reader: {err}")).await,
        };

        match polled {
            None => {
                if self.ignored_badge.is_none() {
                    return;
                }
                // A dropout shorter than the debounce window is not a removal.
                let absent_since = *self.ignored_absent_since.get_or_insert(now);
                if now.duration_since(absent_since) < self.config.debounce_window() {
                    return;
                }
                self.release_ignored_badge();
                if self.feedback.current() == Some(FeedbackKind::CardLeft) {
                    self.feedback
                        .begin(self.config.feedback.sequence(FeedbackKind::Idle), now);
                }
            }
            Some(badge) if self.ignored_badge == Some(badge) => {
                trace!(%badge, "Badge still in reader, ignoring");
                self.ignored_absent_since = None;
            }
            Some(badge) => {
                self.release_ignored_badge();
                debug!(%badge, "Badge presented");
                let entered = self
                    .change_state(
                        ControllerState::Authorizing(badge),
                        AccessEvent::BadgePresented,
                        FeedbackKind::Scanning,
                    )
                    .await;
                if entered {
                    // Show scanning feedback before waiting on the directory.
                    self.advance_feedback(now).await;
                    self.authorize_pending().await;
                }
            }
        }
    }

    async fn authorize_pending(&mut self) {
        let badge = match self.machine.state() {
            ControllerState::Authorizing(badge) => *badge,
            _ => return,
        };

        let outcome = authorize_with_retry(
            &mut self.authorizer,
            &badge,
            &self.config.retry,
            self.config.auth_timeout(),
            &self.shutdown,
        )
        .await;

        let (result, attempts) = match outcome {
            AuthorizationOutcome::Cancelled => {
                info!(%badge, "Authorization interrupted by shutdown");
                return self.shutdown().await;
            }
            AuthorizationOutcome::Completed { result, attempts } => (result, attempts),
        };

        match result {
            AuthorizationResult::Granted { policy } => {
                info!(
                    %badge,
                    equipment = %policy.equipment_name,
                    max_session = ?policy.max_session,
                    idle_timeout = ?policy.idle_timeout,
                    attempts,
                    "Access granted"
                );
                self.equipment_name = Some(policy.equipment_name.clone());
                let session = Session::start(badge, policy, Instant::now());
                self.change_state(
                    ControllerState::Active(session),
                    AccessEvent::AccessGranted,
                    FeedbackKind::Granted,
                )
                .await;
            }
            AuthorizationResult::Denied { reason } => {
                info!(%badge, %reason, "Access denied");
                self.ignore_badge(badge);
                self.change_state(
                    ControllerState::Idle,
                    AccessEvent::AccessDenied { reason },
                    FeedbackKind::Denied,
                )
                .await;
            }
            AuthorizationResult::Unreachable => {
                warn!(%badge, attempts, "Authorization directory unreachable");
                self.ignore_badge(badge);
                self.change_state(
                    ControllerState::Idle,
                    AccessEvent::AuthorizationUnreachable { attempts },
                    FeedbackKind::Offline,
                )
                .await;
            }
        }
    }

    async fn tick_active(&mut self, now: Instant) {
        let limit = self.config.output_timeout();
        let polled = match bounded(limit, self.reader.poll()).await {
            Ok(polled) => polled,
            Err(err) => return self.lockout(format!("card reader: {err}")).await,
        };
        let pressed = match bounded(limit, self.button.activity_detected()).await {
            Ok(pressed) => pressed,
            Err(err) => return self.lockout(format!("activity button: {err}")).await,
        };

        let debounce = self.config.debounce_window();
        let warning_window = self.config.warning_window();
        let Some(session) = self.machine.state_mut().session_mut() else {
            return;
        };
        let badge = session.badge();

        match polled {
            Some(seen) if seen == badge => session.mark_seen(now),
            Some(other) => trace!(badge = %other, "Ignoring second badge during session"),
            None => {}
        }
        let present = !session.is_badge_missing(now);

        let ending = if pressed && !present {
            Some(SessionEnd::Removed)
        } else {
            if pressed {
                debug!(%badge, "Activity, session renewed");
                session.record_activity(now);
            }
            session.check_expiry(now, debounce)
        };

        if let Some(end) = ending {
            return self.end_session(badge, end, present).await;
        }

        let phase = session.phase_at(now, warning_window);
        if phase != session.phase() {
            session.set_phase(phase);
            let kind = match phase {
                SessionPhase::Running => FeedbackKind::Active,
                SessionPhase::BadgeMissing => FeedbackKind::BadgeMissing,
                SessionPhase::TimeoutWarning => FeedbackKind::TimeoutWarning,
            };
            debug!(%badge, ?phase, "Session phase changed");
            self.feedback
                .begin(self.config.feedback.sequence(kind), now);
        }
    }

    async fn end_session(&mut self, badge: Badge, end: SessionEnd, badge_present: bool) {
        info!(%badge, reason = %end, "Session ended");
        let card_left = end.is_timeout() && badge_present;
        if badge_present {
            self.ignore_badge(badge);
        }

        let feedback = if card_left {
            FeedbackKind::CardLeft
        } else {
            FeedbackKind::SessionEnded
        };
        if !self
            .change_state(ControllerState::Idle, end.event(), feedback)
            .await
        {
            return;
        }

        if card_left {
            let message = self
                .config
                .notifications
                .card_left(&badge, self.equipment_name().unwrap_or("equipment"));
            self.record(&AccessEvent::CardLeftInReader, Some(badge), Some(message))
                .await;
        }
    }

    fn ignore_badge(&mut self, badge: Badge) {
        self.ignored_badge = Some(badge);
        self.ignored_absent_since = None;
    }

    fn release_ignored_badge(&mut self) {
        if let Some(badge) = self.ignored_badge.take() {
            debug!(%badge, "Badge left the reader");
        }
        self.ignored_absent_since = None;
    }

    /// Transition, escalating any failure to fault lockout.
    ///
    /// Returns whether the requested state was entered.
    async fn change_state(
        &mut self,
        next: ControllerState,
        event: AccessEvent,
        feedback: FeedbackKind,
    ) -> bool {
        match self.transition(next, event, feedback).await {
            Ok(()) => true,
            Err(err) => {
                self.lockout(err.to_string()).await;
                false
            }
        }
    }

    /// The one place state changes and the only caller of the relay.
    ///
    /// The relay is commanded before the state changes, so a failed command
    /// leaves the state untouched. Entering `FaultLockout` or `ShuttingDown`
    /// always commands the relay off and proceeds even if that fails.
    async fn transition(
        &mut self,
        next: ControllerState,
        event: AccessEvent,
        feedback: FeedbackKind,
    ) -> Result<()> {
        let from = self.machine.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let badge = next.badge().or_else(|| self.machine.state().badge());
        let forced_off = matches!(to, StateKind::FaultLockout | StateKind::ShuttingDown);
        let energize = to.relay_energized();
        if energize != self.relay_energized || forced_off || from == StateKind::FaultLockout {
            match self.command_relay(energize).await {
                Ok(()) => self.relay_energized = energize,
                Err(err) if forced_off => {
                    error!(error = %err, state = %to, "Relay did not confirm off");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let (_, transition) = self.machine.transition_to(next, event.name())?;
        info!(
            from = %transition.from,
            to = %transition.to,
            cause = %transition.cause,
            relay = self.relay_energized,
            "State transition"
        );

        self.feedback
            .begin(self.config.feedback.sequence(feedback), Instant::now());
        self.record(&event, badge, None).await;
        Ok(())
    }

    async fn command_relay(&mut self, energize: bool) -> portalbox_hardware::Result<()> {
        let limit = self.config.output_timeout();
        bounded(limit, self.outputs.set_relay(energize)).await
    }

    async fn lockout(&mut self, detail: String) {
        let current = self.machine.kind();
        if matches!(current, StateKind::FaultLockout | StateKind::ShuttingDown) {
            error!(%detail, state = %current, "Hardware fault");
            return;
        }

        error!(%detail, state = %current, "Hardware fault, entering lockout");
        self.fault_detail = Some(detail.clone());
        if let Err(err) = self
            .transition(
                ControllerState::FaultLockout,
                AccessEvent::HardwareFault { detail },
                FeedbackKind::Fault,
            )
            .await
        {
            error!(error = %err, "Could not enter fault lockout");
        }
    }

    async fn advance_feedback(&mut self, now: Instant) {
        for step in self.feedback.due(now) {
            if let Err(err) = self.apply_feedback(step).await {
                return self.lockout(format!("feedback output: {err}")).await;
            }
        }
    }

    async fn apply_feedback(&mut self, step: FeedbackStep) -> portalbox_hardware::Result<()> {
        let limit = self.config.output_timeout();
        if let Some(pattern) = step.leds {
            bounded(limit, self.outputs.set_leds(pattern)).await?;
        }
        if let Some(pattern) = step.buzz {
            bounded(limit, self.outputs.buzz(pattern)).await?;
        }
        Ok(())
    }

    /// Write to the audit log, bounded by the configured timeout.
    async fn record(&mut self, event: &AccessEvent, badge: Option<Badge>, message: Option<String>) {
        let mut context = EventContext::new(self.machine.kind().to_string());
        if let Some(badge) = badge {
            context = context.with_badge(badge);
        }
        if let Some(equipment) = self.equipment_name() {
            context = context.with_equipment(equipment);
        }
        if let Some(message) = message {
            context = context.with_message(message);
        }

        let limit = self.config.event_log_timeout();
        if tokio::time::timeout(limit, self.logger.record(event, &context))
            .await
            .is_err()
        {
            warn!(event = event.name(), ?limit, "Audit log write timed out");
        }
    }
}

/// Await a device call, failing with [`HardwareError::Timeout`] after `limit`.
async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = portalbox_hardware::Result<T>>,
) -> portalbox_hardware::Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(HardwareError::timeout(
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
