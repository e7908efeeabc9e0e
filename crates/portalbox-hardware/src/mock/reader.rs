//! Mock RFID reader implementation for testing and development.
//!
//! The reader shares its state with a [`MockCardReaderHandle`], which tests
//! and the simulator use to place a badge in the field, take it out, or make
//! the reader fail.

use portalbox_core::Badge;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Result,
    error::HardwareError,
    traits::CardReader,
    types::DeviceInfo,
};

#[derive(Debug, Default)]
struct ReaderState {
    /// Badge currently in the field.
    present: Option<Badge>,

    /// Number of upcoming polls that miss the badge (simulated dropouts).
    dropouts: u32,

    /// When set, every poll fails.
    faulted: bool,

    /// Total number of `poll()` calls.
    polls: u64,
}

fn lock(state: &Mutex<ReaderState>) -> MutexGuard<'_, ReaderState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock RFID reader for testing and development.
///
/// # Examples
///
/// ```
/// use portalbox_core::Badge;
/// use portalbox_hardware::mock::MockCardReader;
/// use portalbox_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> portalbox_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///     assert_eq!(reader.poll().await?, None);
///
///     let badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);
///     handle.present(badge);
///     assert_eq!(reader.poll().await?, Some(badge));
///
///     handle.remove();
///     assert_eq!(reader.poll().await?, None);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    state: Arc<Mutex<ReaderState>>,
    name: String,
}

impl MockCardReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns the reader and a handle that controls what it reports.
    pub fn new() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock Card Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockCardReaderHandle) {
        let state = Arc::new(Mutex::new(ReaderState::default()));
        let reader = Self {
            state: Arc::clone(&state),
            name,
        };
        (reader, MockCardReaderHandle { state })
    }
}

impl CardReader for MockCardReader {
    async fn poll(&mut self) -> Result<Option<Badge>> {
        let mut state = lock(&self.state);
        state.polls += 1;

        if state.faulted {
            return Err(HardwareError::card_read("reader not responding"));
        }
        if state.dropouts > 0 {
            state.dropouts -= 1;
            return Ok(None);
        }
        Ok(state.present)
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock"))
    }
}

/// Handle for controlling a [`MockCardReader`].
///
/// Cloning the handle shares the same reader.
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

impl MockCardReaderHandle {
    /// Place a badge in the reader's field, replacing any other badge.
    pub fn present(&self, badge: Badge) {
        lock(&self.state).present = Some(badge);
    }

    /// Take the badge out of the field.
    pub fn remove(&self) {
        lock(&self.state).present = None;
    }

    /// Make the next `polls` reads miss the badge even though it is present.
    pub fn drop_reads(&self, polls: u32) {
        lock(&self.state).dropouts = polls;
    }

    /// Make every poll fail (`true`) or behave normally (`false`).
    pub fn set_faulted(&self, faulted: bool) {
        lock(&self.state).faulted = faulted;
    }

    /// Badge currently in the field.
    pub fn current(&self) -> Option<Badge> {
        lock(&self.state).present
    }

    /// Number of times the reader has been polled.
    pub fn poll_count(&self) -> u64 {
        lock(&self.state).polls
    }
}
