//! Liveness file for an external watchdog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use portalbox_controller::StateKind;
use tokio::time::Instant;
use tracing::warn;

use crate::config::WatchdogConfig;

/// Writes the controller state to a file after each tick.
///
/// The file is rewritten when the state changes, and otherwise at most once
/// per interval. A stale file means the control loop has stopped.
#[derive(Debug)]
pub struct Watchdog {
    path: PathBuf,
    interval: Duration,
    last: Option<(StateKind, Instant)>,
    failing: bool,
}

impl Watchdog {
    /// `None` when the watchdog is disabled.
    pub fn from_config(config: &WatchdogConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(&config.path, Duration::from_millis(config.interval_ms)))
    }

    pub fn new(path: impl AsRef<Path>, interval: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            interval,
            last: None,
            failing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `state`, rewriting the file if due. Returns whether it wrote.
    pub fn feed(&mut self, state: StateKind, now: Instant) -> bool {
        let due = match self.last {
            Some((previous, at)) => previous != state || now.duration_since(at) >= self.interval,
            None => true,
        };
        if !due {
            return false;
        }

        match std::fs::write(&self.path, format!("{state}\n")) {
            Ok(()) => {
                self.failing = false;
                self.last = Some((state, now));
                true
            }
            Err(err) => {
                // Warn once per failure streak; the loop keeps running either way.
                if !self.failing {
                    warn!(path = %self.path.display(), error = %err, "Failed to write watchdog file");
                    self.failing = true;
                }
                false
            }
        }
    }
}
