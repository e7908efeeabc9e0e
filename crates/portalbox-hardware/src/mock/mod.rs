//! Mock device implementations for testing and development.
//!
//! Each mock comes with a handle that shares its state, so a test (or the
//! simulator in `portalbox-cli`) can drive inputs and observe outputs while
//! the controller owns the device itself.

pub mod button;
pub mod outputs;
pub mod reader;

// Re-export commonly used types
pub use button::{MockButton, MockButtonHandle};
pub use outputs::{CommandRecord, FaultMode, MockOutputDevice, MockOutputHandle, OutputCommand};
pub use reader::{MockCardReader, MockCardReaderHandle};
