//! Mock push button.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{Result, error::HardwareError, traits::ActivityInput};

#[derive(Debug, Default)]
struct ButtonState {
    pending_presses: AtomicU32,
    faulted: AtomicBool,
}

/// Mock push button. Presses are queued by the handle and reported once each.
#[derive(Debug)]
pub struct MockButton {
    state: Arc<ButtonState>,
}

impl MockButton {
    pub fn new() -> (Self, MockButtonHandle) {
        let state = Arc::new(ButtonState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockButtonHandle { state },
        )
    }
}

impl ActivityInput for MockButton {
    async fn activity_detected(&mut self) -> Result<bool> {
        if self.state.faulted.load(Ordering::SeqCst) {
            return Err(HardwareError::communication("button input not readable"));
        }
        // Consume at most one press per call.
        let consumed = self
            .state
            .pending_presses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(consumed)
    }
}

/// Handle for pressing a [`MockButton`].
#[derive(Debug, Clone)]
pub struct MockButtonHandle {
    state: Arc<ButtonState>,
}

impl MockButtonHandle {
    /// Queue one button press.
    pub fn press(&self) {
        self.state.pending_presses.fetch_add(1, Ordering::SeqCst);
    }

    /// Make the button input fail (`true`) or recover (`false`).
    pub fn set_faulted(&self, faulted: bool) {
        self.state.faulted.store(faulted, Ordering::SeqCst);
    }

    /// Presses not yet observed by the button's owner.
    pub fn pending(&self) -> u32 {
        self.state.pending_presses.load(Ordering::SeqCst)
    }
}
