//! End-to-end controller scenarios against mock peripherals.

use std::time::Duration;

use portalbox_controller::mock::{MemoryEventLog, MemoryEventLogger, ScriptedAuthorizer, ScriptedAuthorizerHandle};
use portalbox_controller::{AccessController, ControllerConfig, StateKind};
use portalbox_core::{AccessEvent, AuthorizationResult, Badge, EquipmentPolicy};
use portalbox_hardware::mock::{
    FaultMode, MockButton, MockButtonHandle, MockCardReader, MockCardReaderHandle,
    MockOutputDevice, MockOutputHandle,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const B1: Badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);
const B2: Badge = Badge::new([0x01, 0x02, 0x03, 0x04]);

type Controller =
    AccessController<MockCardReader, MockButton, MockOutputDevice, ScriptedAuthorizer, MemoryEventLogger>;

struct Bench {
    controller: Controller,
    card: MockCardReaderHandle,
    button: MockButtonHandle,
    outputs: MockOutputHandle,
    directory: ScriptedAuthorizerHandle,
    log: MemoryEventLog,
}

impl Bench {
    fn new(config: ControllerConfig) -> Self {
        let (reader, card) = MockCardReader::new();
        let (button, button_handle) = MockButton::new();
        let (outputs, outputs_handle) = MockOutputDevice::new();
        let (directory, script) = ScriptedAuthorizer::new();
        let (logger, log) = MemoryEventLogger::new();
        let controller =
            AccessController::new(config, reader, button, outputs, directory, logger).unwrap();
        Self {
            controller,
            card,
            button: button_handle,
            outputs: outputs_handle,
            directory: script,
            log,
        }
    }

    /// Tick once per poll interval for `duration`.
    async fn run_for(&mut self, duration: Duration) -> StateKind {
        let step = self.controller.config().poll_interval();
        let deadline = Instant::now() + duration;
        let mut state = self.controller.kind();
        while Instant::now() < deadline {
            tokio::time::advance(step).await;
            state = self.controller.tick().await;
        }
        state
    }
}

fn laser_cutter() -> EquipmentPolicy {
    EquipmentPolicy::new(
        "Laser Cutter",
        Duration::from_secs(3600),
        Duration::from_secs(300),
    )
}

#[tokio::test(start_paused = true)]
async fn granted_session_ends_when_badge_removed() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_granted(B1, laser_cutter());
    bench.controller.start().await;

    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Active);
    assert!(bench.outputs.relay_energized());

    bench.run_for(Duration::from_secs(60)).await;
    assert_eq!(bench.controller.kind(), StateKind::Active);

    bench.card.remove();
    assert_eq!(bench.run_for(Duration::from_millis(2100)).await, StateKind::Idle);
    assert!(!bench.outputs.relay_energized());
    assert_eq!(
        bench.log.names(),
        vec![
            "started",
            "badge_presented",
            "access_granted",
            "session_ended_removed"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unreachable_directory_never_grants() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_unreachable(B2);

    bench.card.present(B2);
    assert_eq!(bench.controller.tick().await, StateKind::Idle);

    assert_eq!(bench.directory.calls(), 3);
    assert!(bench.outputs.relay_commands().is_empty());
    assert_eq!(
        bench.log.events().last(),
        Some(&AccessEvent::AuthorizationUnreachable { attempts: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_directory_counts_as_unreachable() {
    let config = ControllerConfig {
        auth_timeout_ms: 500,
        ..ControllerConfig::default()
    };
    let mut bench = Bench::new(config);
    bench.directory.set_granted(B1, laser_cutter());
    bench.directory.set_delay(Duration::from_secs(30));

    let started = Instant::now();
    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Idle);

    // Three 500ms attempts plus 250ms and 500ms of backoff.
    assert_eq!(started.elapsed(), Duration::from_millis(2250));
    assert!(!bench.outputs.relay_energized());
    assert!(bench.log.contains("authorization_unreachable"));
}

#[tokio::test(start_paused = true)]
async fn directory_recovers_between_attempts() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_granted(B1, laser_cutter());
    bench
        .directory
        .queue(B1, [AuthorizationResult::Unreachable, AuthorizationResult::Unreachable]);

    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Active);
    assert_eq!(bench.directory.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn max_duration_overrides_activity() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_granted(
        B1,
        EquipmentPolicy::new("3D Printer", Duration::from_secs(60), Duration::from_secs(30)),
    );
    bench.card.present(B1);
    bench.controller.tick().await;

    for _ in 0..12 {
        bench.button.press();
        bench.run_for(Duration::from_secs(5)).await;
    }
    bench.run_for(Duration::from_secs(1)).await;

    assert_eq!(bench.controller.kind(), StateKind::Idle);
    assert!(!bench.outputs.relay_energized());
    assert!(bench.log.contains("session_ended_max_duration"));
    assert!(bench.log.contains("card_left_in_reader"));
}

#[tokio::test(start_paused = true)]
async fn badge_left_in_reader_must_be_represented() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_granted(
        B1,
        EquipmentPolicy::new("Lathe", Duration::ZERO, Duration::from_secs(20)),
    );
    bench.card.present(B1);
    bench.controller.tick().await;

    assert_eq!(bench.run_for(Duration::from_secs(21)).await, StateKind::Idle);
    assert_eq!(bench.controller.ignored_badge(), Some(B1));

    bench.card.remove();
    bench.run_for(Duration::from_millis(2100)).await;
    assert_eq!(bench.controller.ignored_badge(), None);
    bench.card.present(B1);
    assert_eq!(bench.run_for(Duration::from_millis(100)).await, StateKind::Active);
    assert_eq!(bench.directory.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn relay_fault_locks_out_until_cleared() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_granted(B1, laser_cutter());
    bench.card.present(B1);
    bench.controller.tick().await;

    bench.outputs.set_relay_fault(FaultMode::FailNext(1));
    bench.card.remove();
    assert_eq!(
        bench.run_for(Duration::from_secs(3)).await,
        StateKind::FaultLockout
    );
    assert!(!bench.outputs.relay_energized());
    assert_eq!(bench.outputs.relay_commands().last(), Some(&(false, true)));

    bench.card.present(B1);
    bench.run_for(Duration::from_secs(2)).await;
    assert_eq!(bench.controller.kind(), StateKind::FaultLockout);
    assert_eq!(bench.directory.calls(), 1);

    assert!(bench.controller.clear_fault().await);
    assert_eq!(bench.run_for(Duration::from_millis(100)).await, StateKind::Active);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_backoff() {
    let mut bench = Bench::new(ControllerConfig::default());
    bench.directory.set_unreachable(B1);
    let handle = bench.controller.handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();
    });

    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::ShuttingDown);
    assert_eq!(bench.directory.calls(), 1);
    assert!(!bench.outputs.relay_energized());
    assert_eq!(bench.log.names().last(), Some(&"shutdown"));
}

#[tokio::test(start_paused = true)]
async fn run_loop_stops_on_external_token() {
    let token = CancellationToken::new();
    let bench = Bench::new(ControllerConfig::default());
    let mut controller = bench.controller.with_shutdown_token(token.clone());
    bench.directory.set_granted(B1, laser_cutter());
    bench.card.present(B1);

    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        stopper.cancel();
    });

    let mut states = Vec::new();
    let final_state = controller.run_with(|state| states.push(state)).await;

    assert_eq!(final_state, StateKind::ShuttingDown);
    assert!(states.contains(&StateKind::Active));
    assert!(!bench.outputs.relay_energized());
    assert_eq!(bench.log.names().first(), Some(&"started"));
    assert!(bench.log.contains("session_ended_shutdown"));
}
