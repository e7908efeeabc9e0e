//! LED and buzzer feedback sequencing.
//!
//! Every transition names a [`FeedbackKind`]; the [`FeedbackTheme`] turns that
//! into a [`FeedbackSequence`] of timed steps, and the [`FeedbackSequencer`]
//! hands out steps as they fall due. Starting a sequence replaces whatever was
//! playing; nothing is ever queued behind it.

use std::time::Duration;

use portalbox_hardware::{BuzzPattern, Color, LedPattern};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// The situations the box signals to the person in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Waiting for a badge.
    Idle,

    /// Badge read, directory lookup in progress.
    Scanning,

    /// Session started.
    Granted,

    /// Back to normal session feedback after a warning.
    Active,

    /// Directory refused the badge.
    Denied,

    /// Directory could not be reached.
    Offline,

    /// Session badge missing, debounce window running.
    BadgeMissing,

    /// Session is about to time out.
    TimeoutWarning,

    /// Session over, box ready for the next badge.
    SessionEnded,

    /// Session timed out with the badge still in the reader.
    CardLeft,

    /// Hardware fault lockout.
    Fault,

    ShuttingDown,
}

/// One timed step of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackStep {
    /// Offset from the start of the sequence.
    pub at: Duration,
    pub leds: Option<LedPattern>,
    pub buzz: Option<BuzzPattern>,
}

impl FeedbackStep {
    pub fn at(at: Duration) -> Self {
        Self {
            at,
            leds: None,
            buzz: None,
        }
    }

    pub fn leds(mut self, pattern: LedPattern) -> Self {
        self.leds = Some(pattern);
        self
    }

    pub fn buzz(mut self, pattern: BuzzPattern) -> Self {
        self.buzz = Some(pattern);
        self
    }
}

/// Steps for one [`FeedbackKind`], ordered by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSequence {
    pub kind: FeedbackKind,
    pub steps: Vec<FeedbackStep>,
}

impl FeedbackSequence {
    pub fn new(kind: FeedbackKind, mut steps: Vec<FeedbackStep>) -> Self {
        steps.sort_by_key(|step| step.at);
        Self { kind, steps }
    }

    /// Offset of the last step.
    pub fn duration(&self) -> Duration {
        self.steps.last().map_or(Duration::ZERO, |step| step.at)
    }
}

/// Colors, tones and timings of every feedback sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackTheme {
    pub idle_color: Color,
    pub idle_pulse_ms: u32,
    pub scanning_color: Color,
    pub active_color: Color,
    pub denied_color: Color,
    pub offline_color: Color,
    pub badge_missing_color: Color,
    pub warning_color: Color,
    pub card_left_color: Color,
    pub fault_color: Color,

    /// Blink period of every flashing pattern.
    pub flash_period_ms: u32,

    /// How long a denial or offline result is shown before returning to idle.
    pub result_hold_ms: u64,

    /// Wipe to idle after a session ends.
    pub session_end_wipe_ms: u32,

    pub confirm_beep_ms: u32,
    pub error_beep_ms: u32,
    pub error_beep_count: u32,

    /// Intermittent beep while a warning is showing.
    pub warning_beep_on_ms: u32,
    pub warning_beep_off_ms: u32,
}

impl Default for FeedbackTheme {
    fn default() -> Self {
        Self {
            idle_color: Color::BLUE,
            idle_pulse_ms: 2_000,
            scanning_color: Color::WHITE,
            active_color: Color::GREEN,
            denied_color: Color::RED,
            offline_color: Color::PURPLE,
            badge_missing_color: Color::YELLOW,
            warning_color: Color::ORANGE,
            card_left_color: Color::RED,
            fault_color: Color::RED,
            flash_period_ms: 200,
            result_hold_ms: 2_000,
            session_end_wipe_ms: 500,
            confirm_beep_ms: 50,
            error_beep_ms: 100,
            error_beep_count: 3,
            warning_beep_on_ms: 100,
            warning_beep_off_ms: 1_900,
        }
    }
}

impl FeedbackTheme {
    fn idle_leds(&self) -> LedPattern {
        LedPattern::Pulse {
            color: self.idle_color,
            period_ms: self.idle_pulse_ms,
        }
    }

    fn error_tone(&self) -> BuzzPattern {
        BuzzPattern::Repeat {
            on_ms: self.error_beep_ms,
            off_ms: self.error_beep_ms,
            count: self.error_beep_count,
        }
    }

    fn warning_tone(&self) -> BuzzPattern {
        BuzzPattern::Repeat {
            on_ms: self.warning_beep_on_ms,
            off_ms: self.warning_beep_off_ms,
            count: 0,
        }
    }

    /// A result shown for `result_hold_ms`, then back to idle.
    fn result_then_idle(&self, kind: FeedbackKind, color: Color) -> FeedbackSequence {
        let flashes = u32::try_from(self.result_hold_ms / u64::from(self.flash_period_ms.max(1)))
            .unwrap_or(u32::MAX)
            .max(1);
        FeedbackSequence::new(
            kind,
            vec![
                FeedbackStep::at(Duration::ZERO)
                    .leds(LedPattern::Flash {
                        color,
                        period_ms: self.flash_period_ms,
                        flashes,
                        end_color: color,
                    })
                    .buzz(self.error_tone()),
                FeedbackStep::at(Duration::from_millis(self.result_hold_ms))
                    .leds(self.idle_leds())
                    .buzz(BuzzPattern::Off),
            ],
        )
    }

    /// Build the sequence for `kind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use portalbox_controller::{FeedbackKind, FeedbackTheme};
    /// use portalbox_hardware::{BuzzPattern, Color, LedPattern};
    ///
    /// let theme = FeedbackTheme::default();
    /// let granted = theme.sequence(FeedbackKind::Granted);
    /// assert_eq!(granted.steps[0].leds, Some(LedPattern::solid(Color::GREEN)));
    /// assert_eq!(granted.steps[0].buzz, Some(BuzzPattern::beep(50)));
    /// ```
    pub fn sequence(&self, kind: FeedbackKind) -> FeedbackSequence {
        let now = FeedbackStep::at(Duration::ZERO);
        let steps = match kind {
            FeedbackKind::Idle => vec![now.leds(self.idle_leds()).buzz(BuzzPattern::Off)],
            FeedbackKind::Scanning => vec![now.leds(LedPattern::solid(self.scanning_color))],
            FeedbackKind::Granted => vec![
                now.leds(LedPattern::solid(self.active_color))
                    .buzz(BuzzPattern::beep(self.confirm_beep_ms)),
            ],
            FeedbackKind::Active => vec![
                now.leds(LedPattern::solid(self.active_color))
                    .buzz(BuzzPattern::Off),
            ],
            FeedbackKind::Denied => return self.result_then_idle(kind, self.denied_color),
            FeedbackKind::Offline => return self.result_then_idle(kind, self.offline_color),
            FeedbackKind::BadgeMissing => vec![
                now.leds(LedPattern::blink(self.badge_missing_color, self.flash_period_ms))
                    .buzz(self.warning_tone()),
            ],
            FeedbackKind::TimeoutWarning => vec![
                now.leds(LedPattern::blink(self.warning_color, self.flash_period_ms))
                    .buzz(self.warning_tone()),
            ],
            FeedbackKind::SessionEnded => vec![
                now.leds(LedPattern::Wipe {
                    color: self.idle_color,
                    duration_ms: self.session_end_wipe_ms,
                })
                .buzz(BuzzPattern::Off),
                FeedbackStep::at(Duration::from_millis(u64::from(self.session_end_wipe_ms)))
                    .leds(self.idle_leds()),
            ],
            FeedbackKind::CardLeft => vec![
                now.leds(LedPattern::solid(self.card_left_color))
                    .buzz(BuzzPattern::Off),
            ],
            FeedbackKind::Fault => vec![
                now.leds(LedPattern::blink(self.fault_color, self.flash_period_ms))
                    .buzz(self.error_tone()),
            ],
            FeedbackKind::ShuttingDown => vec![now.leds(LedPattern::Off).buzz(BuzzPattern::Off)],
        };
        FeedbackSequence::new(kind, steps)
    }
}

#[derive(Debug)]
struct Playing {
    sequence: FeedbackSequence,
    started_at: Instant,
    next_step: usize,
}

/// Plays one [`FeedbackSequence`] at a time.
///
/// The sequencer never touches hardware itself; [`due`](Self::due) returns
/// the steps the caller should apply now.
#[derive(Debug, Default)]
pub struct FeedbackSequencer {
    playing: Option<Playing>,
}

impl FeedbackSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `sequence`, preempting the one in flight.
    pub fn begin(&mut self, sequence: FeedbackSequence, now: Instant) {
        self.playing = Some(Playing {
            sequence,
            started_at: now,
            next_step: 0,
        });
    }

    /// Kind of the sequence that started last.
    pub fn current(&self) -> Option<FeedbackKind> {
        self.playing.as_ref().map(|playing| playing.sequence.kind)
    }

    /// Whether every step of the current sequence has been handed out.
    pub fn is_finished(&self) -> bool {
        self.playing
            .as_ref()
            .is_none_or(|playing| playing.next_step >= playing.sequence.steps.len())
    }

    /// Steps whose offset has been reached, in order. Each step is returned once.
    pub fn due(&mut self, now: Instant) -> Vec<FeedbackStep> {
        let Some(playing) = self.playing.as_mut() else {
            return Vec::new();
        };
        let elapsed = now.saturating_duration_since(playing.started_at);
        let pending = &playing.sequence.steps[playing.next_step..];
        let ready = pending.iter().take_while(|step| step.at <= elapsed).count();
        let steps = pending[..ready].to_vec();
        playing.next_step += ready;
        steps
    }
}
