//! Devices that stop answering must not hold the relay on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use portalbox_controller::mock::{MemoryEventLog, MemoryEventLogger, ScriptedAuthorizer};
use portalbox_controller::{AccessController, ControllerConfig, StateKind};
use portalbox_core::{Badge, EquipmentPolicy};
use portalbox_hardware::mock::{
    MockButton, MockCardReader, MockCardReaderHandle, MockOutputDevice, MockOutputHandle,
};
use portalbox_hardware::{BuzzPattern, CardReader, DeviceInfo, LedPattern, OutputDevice, Result};
use tokio::time::Instant;

const B1: Badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);

/// Switch shared between a wrapped device and the test.
#[derive(Clone, Default)]
struct Stall(Arc<AtomicBool>);

impl Stall {
    fn engage(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    async fn wait_if_engaged(&self) {
        if self.0.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

/// Output stage whose LED array hangs once stalled.
struct HangingLeds {
    inner: MockOutputDevice,
    stall: Stall,
}

impl OutputDevice for HangingLeds {
    async fn set_relay(&mut self, energized: bool) -> Result<()> {
        self.inner.set_relay(energized).await
    }

    async fn set_leds(&mut self, pattern: LedPattern) -> Result<()> {
        self.stall.wait_if_engaged().await;
        self.inner.set_leds(pattern).await
    }

    async fn buzz(&mut self, pattern: BuzzPattern) -> Result<()> {
        self.inner.buzz(pattern).await
    }
}

/// Card reader that hangs once stalled.
struct HangingReader {
    inner: MockCardReader,
    stall: Stall,
}

impl CardReader for HangingReader {
    async fn poll(&mut self) -> Result<Option<Badge>> {
        self.stall.wait_if_engaged().await;
        self.inner.poll().await
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        self.inner.get_info().await
    }
}

type Controller =
    AccessController<HangingReader, MockButton, HangingLeds, ScriptedAuthorizer, MemoryEventLogger>;

struct Bench {
    controller: Controller,
    card: MockCardReaderHandle,
    outputs: MockOutputHandle,
    log: MemoryEventLog,
    reader_stall: Stall,
    led_stall: Stall,
}

fn bench(policy: EquipmentPolicy) -> Bench {
    let (reader, card) = MockCardReader::new();
    let (button, _button) = MockButton::new();
    let (outputs, outputs_handle) = MockOutputDevice::new();
    let (directory, script) = ScriptedAuthorizer::new();
    let (logger, log) = MemoryEventLogger::new();
    script.set_granted(B1, policy);

    let reader_stall = Stall::default();
    let led_stall = Stall::default();
    let controller = AccessController::new(
        ControllerConfig::default(),
        HangingReader {
            inner: reader,
            stall: reader_stall.clone(),
        },
        button,
        HangingLeds {
            inner: outputs,
            stall: led_stall.clone(),
        },
        directory,
        logger,
    )
    .unwrap();

    Bench {
        controller,
        card,
        outputs: outputs_handle,
        log,
        reader_stall,
        led_stall,
    }
}

async fn tick_for(controller: &mut Controller, duration: Duration) -> StateKind {
    let step = controller.config().poll_interval();
    let deadline = Instant::now() + duration;
    let mut state = controller.kind();
    while Instant::now() < deadline {
        tokio::time::advance(step).await;
        state = controller.tick().await;
    }
    state
}

#[tokio::test(start_paused = true)]
async fn hanging_leds_during_session_force_relay_off() {
    let mut bench = bench(EquipmentPolicy::new(
        "Laser Cutter",
        Duration::from_secs(5),
        Duration::from_secs(5),
    ));
    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Active);
    assert!(bench.outputs.relay_energized());

    bench.led_stall.engage();
    bench.card.remove();

    let state = tokio::time::timeout(
        Duration::from_secs(60),
        tick_for(&mut bench.controller, Duration::from_secs(10)),
    )
    .await
    .expect("ticks must keep returning while the LEDs hang");

    assert_eq!(state, StateKind::FaultLockout);
    assert!(!bench.outputs.relay_energized());
    assert!(!bench.controller.relay_energized());
    assert!(bench.controller.fault_detail().unwrap().contains("feedback output"));
    assert!(bench.log.contains("hardware_fault"));
}

#[tokio::test(start_paused = true)]
async fn hanging_reader_locks_out_within_output_timeout() {
    let mut bench = bench(EquipmentPolicy::new(
        "Lathe",
        Duration::from_secs(3600),
        Duration::from_secs(300),
    ));
    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Active);

    bench.reader_stall.engage();
    let started = Instant::now();
    assert_eq!(bench.controller.tick().await, StateKind::FaultLockout);

    let limit = bench.controller.config().output_timeout();
    assert!(started.elapsed() <= limit * 2);
    assert!(!bench.outputs.relay_energized());
    assert!(bench.controller.fault_detail().unwrap().contains("card reader"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_still_honored_while_leds_hang() {
    let mut bench = bench(EquipmentPolicy::unlimited("Drill Press"));
    bench.card.present(B1);
    assert_eq!(bench.controller.tick().await, StateKind::Active);

    bench.led_stall.engage();
    bench.controller.handle().shutdown();

    let state = tokio::time::timeout(Duration::from_secs(10), bench.controller.tick())
        .await
        .expect("shutdown tick must return");
    assert_eq!(state, StateKind::ShuttingDown);
    assert!(!bench.outputs.relay_energized());
    assert!(bench.log.contains("shutdown"));
}
