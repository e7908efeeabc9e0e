//! Peripherals driven from standard input.
//!
//! Until hardware drivers are wired in, `portalbox run` owns mock devices and
//! reads commands such as `present 04ABCDEF` from stdin, one per line.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use portalbox_controller::ControllerHandle;
use portalbox_core::Badge;
use portalbox_hardware::mock::{
    FaultMode, MockButton, MockButtonHandle, MockCardReader, MockCardReaderHandle,
    MockOutputDevice, MockOutputHandle,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const HELP: &str = "\
commands:
  present <badge>   badge enters the reader (hex 04ABCDEF or decimal #78368239)
  remove            badge leaves the reader
  drop <polls>      reader misses the badge for <polls> polls
  press             press the activity button
  fault <output>    next relay|leds|buzzer command fails
  reset             request a fault lockout reset
  status            print relay and reader state
  quit              shut down";

/// One line of simulator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    Present(Badge),
    Remove,
    Drop(u32),
    Press,
    Fault(FaultTarget),
    Reset,
    Status,
    Quit,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    Relay,
    Leds,
    Buzzer,
}

impl FromStr for SimCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let argument = words.next();
        if words.next().is_some() {
            bail!("too many arguments to {command:?}");
        }

        let parsed = match (command.to_ascii_lowercase().as_str(), argument) {
            ("present", Some(badge)) => Self::Present(badge.parse().context("invalid badge")?),
            ("remove", None) => Self::Remove,
            ("drop", Some(polls)) => Self::Drop(polls.parse().context("invalid poll count")?),
            ("press", None) => Self::Press,
            ("fault", Some(target)) => Self::Fault(match target {
                "relay" => FaultTarget::Relay,
                "leds" => FaultTarget::Leds,
                "buzzer" => FaultTarget::Buzzer,
                other => bail!("unknown output {other:?}"),
            }),
            ("reset", None) => Self::Reset,
            ("status", None) => Self::Status,
            ("quit" | "exit", None) => Self::Quit,
            ("help" | "?", None) => Self::Help,
            (other, _) => bail!("unknown command or wrong arguments: {other:?}"),
        };
        Ok(parsed)
    }
}

/// Control side of the simulated devices.
#[derive(Debug, Clone)]
pub struct Simulator {
    pub card: MockCardReaderHandle,
    pub button: MockButtonHandle,
    pub outputs: MockOutputHandle,
}

/// Devices handed to the controller.
pub struct SimulatedDevices {
    pub reader: MockCardReader,
    pub button: MockButton,
    pub outputs: MockOutputDevice,
}

impl Simulator {
    pub fn new() -> (Self, SimulatedDevices) {
        let (reader, card) = MockCardReader::new();
        let (button, button_handle) = MockButton::new();
        let (outputs, outputs_handle) = MockOutputDevice::new();
        (
            Self {
                card,
                button: button_handle,
                outputs: outputs_handle,
            },
            SimulatedDevices {
                reader,
                button,
                outputs,
            },
        )
    }

    /// Apply a command. Returns `false` once the simulator should stop.
    pub fn apply(&self, command: SimCommand, controller: &ControllerHandle) -> bool {
        match command {
            SimCommand::Present(badge) => self.card.present(badge),
            SimCommand::Remove => self.card.remove(),
            SimCommand::Drop(polls) => self.card.drop_reads(polls),
            SimCommand::Press => self.button.press(),
            SimCommand::Fault(FaultTarget::Relay) => {
                self.outputs.set_relay_fault(FaultMode::FailNext(1))
            }
            SimCommand::Fault(FaultTarget::Leds) => {
                self.outputs.set_led_fault(FaultMode::FailNext(1))
            }
            SimCommand::Fault(FaultTarget::Buzzer) => {
                self.outputs.set_buzzer_fault(FaultMode::FailNext(1))
            }
            SimCommand::Reset => controller.request_fault_reset(),
            SimCommand::Status => info!(
                relay = self.outputs.relay_energized(),
                badge = self.card.current().map(|b| b.to_hex()).as_deref(),
                leds = ?self.outputs.leds(),
                "Simulator status"
            ),
            SimCommand::Help => println!("{HELP}"),
            SimCommand::Quit => {
                controller.shutdown();
                return false;
            }
        }
        true
    }

    /// Read commands from `input` until EOF, `quit`, or cancellation.
    pub async fn drive<I>(&self, input: I, controller: ControllerHandle, cancel: CancellationToken)
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Simulator input closed");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "Failed to read simulator input");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<SimCommand>() {
                Ok(command) => {
                    debug!(?command, "Simulator command");
                    if !self.apply(command, &controller) {
                        break;
                    }
                }
                Err(err) => warn!("{err:#} (type `help` for commands)"),
            }
        }
    }
}
