//! Timing and sizing constants shared across the PortalBox crates.
//!
//! These are defaults. Every timing value here can be overridden through the
//! controller configuration; the constants only exist so that an empty
//! configuration file produces a conservative, fail-closed box.
//!
//! # Usage
//!
//! ```
//! use portalbox_core::constants::*;
//! use std::time::Duration;
//!
//! let poll = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! let debounce = Duration::from_millis(DEFAULT_DEBOUNCE_WINDOW_MS);
//! assert!(debounce >= poll * 2);
//! ```

// ============================================================================
// Badge
// ============================================================================

/// Length in bytes of a badge UID as reported by the reader.
///
/// The reader anti-collision loop yields four bytes, MSB first, which the
/// directory stores as an unsigned 32-bit card id.
pub const BADGE_UID_LEN: usize = 4;

// ============================================================================
// Control loop
// ============================================================================

/// Interval between controller ticks (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How long the session badge may be absent before the session ends (milliseconds).
///
/// Must be at least twice the poll interval so that a single missed read
/// never ends a session.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 2_000;

/// Minimum ratio between the debounce window and the poll interval.
pub const MIN_DEBOUNCE_POLL_RATIO: u32 = 2;

// ============================================================================
// Authorization
// ============================================================================

/// Upper bound for a single authorization attempt (milliseconds).
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 3_000;

/// Total authorization attempts before failing closed.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;

/// Delay before the first retry (milliseconds).
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Growth factor applied to the delay after each failed attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Cap on a single backoff delay (milliseconds).
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

// ============================================================================
// Session policy
// ============================================================================

/// Idle timeout used when the directory does not specify one (seconds).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// Maximum session length used when the directory does not specify one (seconds).
pub const DEFAULT_MAX_SESSION_SECS: u64 = 4 * 60 * 60;

/// Remaining idle time at which the timeout warning starts (seconds).
pub const DEFAULT_WARNING_WINDOW_SECS: u64 = 10;

// ============================================================================
// Shutdown and logging
// ============================================================================

/// Bound on a single relay command (milliseconds).
///
/// This is also the grace period for forcing the relay off at shutdown.
pub const DEFAULT_OUTPUT_TIMEOUT_MS: u64 = 1_000;

/// Bound on a single audit log write (milliseconds).
pub const DEFAULT_EVENT_LOG_TIMEOUT_MS: u64 = 500;
