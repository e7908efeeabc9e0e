//! Hardware abstraction layer for the PortalBox equipment access controller.
//!
//! A PortalBox sits between a piece of shared equipment and its power supply.
//! This crate defines the capabilities the controller needs from the box:
//!
//! - [`CardReader`] - RFID reader reporting the badge in its field
//! - [`ActivityInput`] - push button used to renew a session
//! - [`OutputDevice`] - power interlock relay, buzzer, and LED array
//!
//! # Design Philosophy
//!
//! - **Async-first**: native `async fn` in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Owned capabilities**: devices are handed to the controller at
//!   construction; nothing reaches the hardware through globals.
//! - **Idempotent outputs**: repeating a command is always safe.
//! - **Error-aware**: every operation returns [`Result<T>`][error::Result] with
//!   a [`HardwareError`]. The controller treats any of them as a fault.
//!
//! # Mock Implementations
//!
//! [`mock`] provides in-memory devices with control handles for tests and for
//! the stdin-driven simulator in `portalbox-cli`. Real drivers (MFRC522 reader,
//! GPIO relay, DotStar LED strip) plug in behind the same traits.
//!
//! ```
//! use portalbox_core::Badge;
//! use portalbox_hardware::mock::{MockCardReader, MockOutputDevice};
//! use portalbox_hardware::{CardReader, OutputDevice};
//!
//! #[tokio::main]
//! async fn main() -> portalbox_hardware::Result<()> {
//!     let (mut reader, card) = MockCardReader::new();
//!     let (mut outputs, observed) = MockOutputDevice::new();
//!
//!     card.present(Badge::new([0x04, 0xAB, 0xCD, 0xEF]));
//!     if reader.poll().await?.is_some() {
//!         outputs.set_relay(true).await?;
//!     }
//!     assert!(observed.relay_energized());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{ActivityInput, CardReader, OutputDevice};
pub use types::{BuzzPattern, Color, DeviceInfo, LedPattern};
