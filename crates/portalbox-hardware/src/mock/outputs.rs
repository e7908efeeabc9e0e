//! Mock output stage (relay, buzzer, LED array).
//!
//! Records every command it receives, successful or not, so tests can assert
//! on the exact command sequence. Faults can be injected per actuator.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Result,
    error::HardwareError,
    traits::OutputDevice,
    types::{BuzzPattern, LedPattern},
};

/// A command issued to the output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    Relay(bool),
    Leds(LedPattern),
    Buzz(BuzzPattern),
}

/// One recorded command and whether the device accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRecord {
    pub command: OutputCommand,
    pub succeeded: bool,
}

/// Fault injection mode for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    #[default]
    Healthy,

    /// The next `n` commands fail, then the actuator recovers.
    FailNext(u32),

    /// Every command fails until the mode is changed.
    Broken,
}

impl FaultMode {
    /// Consume one command; returns whether it fails.
    fn trip(&mut self) -> bool {
        match self {
            Self::Healthy => false,
            Self::Broken => true,
            Self::FailNext(0) => {
                *self = Self::Healthy;
                false
            }
            Self::FailNext(n) => {
                *n -= 1;
                if *n == 0 {
                    *self = Self::Healthy;
                }
                true
            }
        }
    }
}

#[derive(Debug, Default)]
struct OutputState {
    relay_energized: bool,
    leds: Option<LedPattern>,
    buzzer: Option<BuzzPattern>,
    log: Vec<CommandRecord>,
    relay_fault: FaultMode,
    led_fault: FaultMode,
    buzzer_fault: FaultMode,
}

fn lock(state: &Mutex<OutputState>) -> MutexGuard<'_, OutputState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock output stage.
///
/// # Examples
///
/// ```
/// use portalbox_hardware::mock::MockOutputDevice;
/// use portalbox_hardware::traits::OutputDevice;
///
/// #[tokio::main]
/// async fn main() -> portalbox_hardware::Result<()> {
///     let (mut outputs, handle) = MockOutputDevice::new();
///     outputs.set_relay(true).await?;
///     assert!(handle.relay_energized());
///     outputs.set_relay(false).await?;
///     assert!(!handle.relay_energized());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockOutputDevice {
    state: Arc<Mutex<OutputState>>,
}

impl MockOutputDevice {
    pub fn new() -> (Self, MockOutputHandle) {
        let state = Arc::new(Mutex::new(OutputState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockOutputHandle { state },
        )
    }
}

impl OutputDevice for MockOutputDevice {
    async fn set_relay(&mut self, energized: bool) -> Result<()> {
        let mut state = lock(&self.state);
        let failed = state.relay_fault.trip();
        state.log.push(CommandRecord {
            command: OutputCommand::Relay(energized),
            succeeded: !failed,
        });
        if failed {
            return Err(HardwareError::relay("relay driver did not acknowledge"));
        }
        state.relay_energized = energized;
        Ok(())
    }

    async fn set_leds(&mut self, pattern: LedPattern) -> Result<()> {
        let mut state = lock(&self.state);
        let failed = state.led_fault.trip();
        state.log.push(CommandRecord {
            command: OutputCommand::Leds(pattern),
            succeeded: !failed,
        });
        if failed {
            return Err(HardwareError::display("LED strip write failed"));
        }
        state.leds = Some(pattern);
        Ok(())
    }

    async fn buzz(&mut self, pattern: BuzzPattern) -> Result<()> {
        let mut state = lock(&self.state);
        let failed = state.buzzer_fault.trip();
        state.log.push(CommandRecord {
            command: OutputCommand::Buzz(pattern),
            succeeded: !failed,
        });
        if failed {
            return Err(HardwareError::buzzer("buzzer GPIO write failed"));
        }
        state.buzzer = Some(pattern);
        Ok(())
    }
}

/// Handle for observing and faulting a [`MockOutputDevice`].
#[derive(Debug, Clone)]
pub struct MockOutputHandle {
    state: Arc<Mutex<OutputState>>,
}

impl MockOutputHandle {
    /// Physical relay state after the last successful relay command.
    pub fn relay_energized(&self) -> bool {
        lock(&self.state).relay_energized
    }

    /// Pattern the LED array currently shows.
    pub fn leds(&self) -> Option<LedPattern> {
        lock(&self.state).leds
    }

    /// Pattern the buzzer is currently playing.
    pub fn buzzer(&self) -> Option<BuzzPattern> {
        lock(&self.state).buzzer
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<CommandRecord> {
        lock(&self.state).log.clone()
    }

    /// Relay commands received so far, in order, with their outcome.
    pub fn relay_commands(&self) -> Vec<(bool, bool)> {
        lock(&self.state)
            .log
            .iter()
            .filter_map(|record| match record.command {
                OutputCommand::Relay(on) => Some((on, record.succeeded)),
                _ => None,
            })
            .collect()
    }

    /// Forget the recorded command log.
    pub fn clear_log(&self) {
        lock(&self.state).log.clear();
    }

    pub fn set_relay_fault(&self, mode: FaultMode) {
        lock(&self.state).relay_fault = mode;
    }

    pub fn set_led_fault(&self, mode: FaultMode) {
        lock(&self.state).led_fault = mode;
    }

    pub fn set_buzzer_fault(&self, mode: FaultMode) {
        lock(&self.state).buzzer_fault = mode;
    }
}
