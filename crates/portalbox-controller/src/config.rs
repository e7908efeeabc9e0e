//! Controller configuration.
//!
//! All durations are stored as integer milliseconds or seconds so that the
//! TOML file stays readable; accessor methods return [`Duration`]s.

use std::time::Duration;

use portalbox_core::constants::{
    DEFAULT_AUTH_TIMEOUT_MS, DEFAULT_DEBOUNCE_WINDOW_MS, DEFAULT_EVENT_LOG_TIMEOUT_MS,
    DEFAULT_OUTPUT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WARNING_WINDOW_SECS,
    MIN_DEBOUNCE_POLL_RATIO,
};
use portalbox_core::{Badge, Error, Result};
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackTheme;
use crate::retry::RetryPolicy;

/// Timing, retry and feedback settings for an [`AccessController`](crate::AccessController).
///
/// # Examples
///
/// ```
/// use portalbox_controller::ControllerConfig;
///
/// let config = ControllerConfig::default();
/// assert!(config.validate().is_ok());
///
/// let bad = ControllerConfig { debounce_window_ms: 150, ..ControllerConfig::default() };
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Delay between reader polls.
    pub poll_interval_ms: u64,

    /// How long the session badge may go unseen before the session ends.
    pub debounce_window_ms: u64,

    /// Bound on a single authorization attempt.
    pub auth_timeout_ms: u64,

    pub retry: RetryPolicy,

    /// Remaining time at which the timeout warning starts. Zero disables it.
    pub warning_window_secs: u64,

    /// Bound on a single relay command, including the one issued at shutdown.
    pub output_timeout_ms: u64,

    /// Bound on a single audit log write.
    pub event_log_timeout_ms: u64,

    /// Equipment name used in audit records before the first session.
    pub equipment_name: Option<String>,

    pub feedback: FeedbackTheme,

    pub notifications: NotificationTemplates,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            auth_timeout_ms: DEFAULT_AUTH_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            warning_window_secs: DEFAULT_WARNING_WINDOW_SECS,
            output_timeout_ms: DEFAULT_OUTPUT_TIMEOUT_MS,
            event_log_timeout_ms: DEFAULT_EVENT_LOG_TIMEOUT_MS,
            equipment_name: None,
            feedback: FeedbackTheme::default(),
            notifications: NotificationTemplates::default(),
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn warning_window(&self) -> Duration {
        Duration::from_secs(self.warning_window_secs)
    }

    pub fn output_timeout(&self) -> Duration {
        Duration::from_millis(self.output_timeout_ms)
    }

    pub fn event_log_timeout(&self) -> Duration {
        Duration::from_millis(self.event_log_timeout_ms)
    }

    /// Check the settings for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        let min_debounce = self
            .poll_interval_ms
            .saturating_mul(u64::from(MIN_DEBOUNCE_POLL_RATIO));
        if self.debounce_window_ms < min_debounce {
            return Err(Error::Config(format!(
                "debounce_window_ms ({}) must be at least {MIN_DEBOUNCE_POLL_RATIO}x poll_interval_ms ({})",
                self.debounce_window_ms, self.poll_interval_ms
            )));
        }
        if self.auth_timeout_ms == 0 {
            return Err(Error::Config("auth_timeout_ms must be positive".into()));
        }
        if self.output_timeout_ms == 0 {
            return Err(Error::Config("output_timeout_ms must be positive".into()));
        }
        if self.event_log_timeout_ms == 0 {
            return Err(Error::Config("event_log_timeout_ms must be positive".into()));
        }
        if self.feedback.flash_period_ms == 0 {
            return Err(Error::Config("feedback.flash_period_ms must be positive".into()));
        }
        self.retry.validate()?;
        self.notifications.validate()
    }
}

/// Message templates for events forwarded to the card holder.
///
/// Placeholders: `{badge}`, `{card_id}`, `{equipment}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationTemplates {
    pub card_left_in_reader: String,
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self {
            card_left_in_reader: "Your badge ({card_id}) was left in the reader of the {equipment} \
                                  after your session ended."
                .to_string(),
        }
    }
}

impl NotificationTemplates {
    /// Render the card-left message.
    ///
    /// ```
    /// use portalbox_controller::NotificationTemplates;
    /// use portalbox_core::Badge;
    ///
    /// let templates = NotificationTemplates {
    ///     card_left_in_reader: "{badge} left at {equipment}".into(),
    /// };
    /// let badge = Badge::new([0x04, 0xAB, 0xCD, 0xEF]);
    /// assert_eq!(templates.card_left(&badge, "Lathe"), "04ABCDEF left at Lathe");
    /// ```
    pub fn card_left(&self, badge: &Badge, equipment: &str) -> String {
        render(&self.card_left_in_reader, badge, equipment)
    }

    pub fn validate(&self) -> Result<()> {
        if self.card_left_in_reader.trim().is_empty() {
            return Err(Error::Config(
                "notifications.card_left_in_reader must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn render(template: &str, badge: &Badge, equipment: &str) -> String {
    template
        .replace("{badge}", &badge.to_hex())
        .replace("{card_id}", &badge.card_id().to_string())
        .replace("{equipment}", equipment)
}
