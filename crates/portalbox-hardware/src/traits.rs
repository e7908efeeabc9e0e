//! Hardware device trait definitions.
//!
//! These traits are the contract between the access controller and the box
//! peripherals: the RFID reader, the push button, and the output stage (relay,
//! buzzer, LED array). Drivers for real hardware and the mocks in
//! [`mock`](crate::mock) both implement them.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.
//!
//! # Object Safety
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn CardReader>` is
//! not available. The controller takes every device as a generic parameter,
//! which also makes it the sole owner of each device.

#![allow(async_fn_in_trait)]

use portalbox_core::Badge;

use crate::error::Result;
use crate::types::{BuzzPattern, DeviceInfo, LedPattern};

/// RFID card reader.
///
/// # Examples
///
/// ```no_run
/// use portalbox_hardware::traits::CardReader;
/// use portalbox_hardware::Result;
///
/// async fn wait_for_badge<R: CardReader>(reader: &mut R) -> Result<()> {
///     while reader.poll().await?.is_none() {
///         tokio::time::sleep(std::time::Duration::from_millis(100)).await;
///     }
///     Ok(())
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Report the badge currently in the reader's field, if any.
    ///
    /// Non-blocking or short-blocking. A momentary `None` while a badge is
    /// physically present is normal; callers debounce.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is disconnected or fails to respond.
    /// A badge that is absent is `Ok(None)`, not an error.
    async fn poll(&mut self) -> Result<Option<Badge>>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Push button used as the activity signal during a session.
pub trait ActivityInput: Send + Sync {
    /// Whether the button was pressed since the previous call.
    ///
    /// Edge-triggered: a press is reported once.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read.
    async fn activity_detected(&mut self) -> Result<bool>;
}

/// Output stage of the box: power interlock relay, buzzer, and LED array.
///
/// Every command must be idempotent. Repeating `set_relay(false)` is always
/// safe and is how the controller confirms the relay is off.
pub trait OutputDevice: Send + Sync {
    /// Energize (`true`) or de-energize (`false`) the equipment relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay command could not be issued. The relay
    /// state is then unknown.
    async fn set_relay(&mut self, energized: bool) -> Result<()>;

    /// Replace whatever the LED array is showing with `pattern`.
    async fn set_leds(&mut self, pattern: LedPattern) -> Result<()>;

    /// Replace whatever the buzzer is playing with `pattern`.
    async fn buzz(&mut self, pattern: BuzzPattern) -> Result<()>;
}
