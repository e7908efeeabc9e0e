//! Common types shared across hardware device implementations.
//!
//! This module defines device information plus the LED and buzzer patterns
//! the output device renders. Patterns are plain data: the controller decides
//! *what* to show, the driver decides *how* to animate it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic device information.
///
/// Contains metadata about a hardware device such as name, model,
/// serial number, and firmware version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "MFRC522", "Mock Card Reader").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional device serial number.
    pub serial_number: Option<String>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial_number: None,
            firmware_version: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// RGB color for the addressable LED array.
///
/// Serialized as a `#RRGGBB` string so that configuration files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const RED: Color = Color::rgb(0xFF, 0x00, 0x00);
    pub const GREEN: Color = Color::rgb(0x00, 0xFF, 0x00);
    pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xFF);
    pub const YELLOW: Color = Color::rgb(0xFF, 0xFF, 0x00);
    pub const ORANGE: Color = Color::rgb(0xDF, 0x20, 0x00);
    pub const PURPLE: Color = Color::rgb(0x80, 0x00, 0x80);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    /// Create a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Get the RGB components.
    pub fn as_rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Color {
    type Err = crate::HardwareError;

    fn from_str(s: &str) -> crate::Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(crate::HardwareError::invalid_data(format!(
                "Color must be #RRGGBB, got {s:?}"
            )));
        }
        let component = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
                crate::HardwareError::invalid_data(format!("Invalid hex in color {s:?}"))
            })
        };
        Ok(Self::rgb(component(0)?, component(2)?, component(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = crate::HardwareError;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// What the LED array should display until told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedPattern {
    /// All pixels dark.
    Off,

    /// Every pixel set to one color.
    Solid { color: Color },

    /// Blink between `color` and black, then settle on `end_color`.
    ///
    /// `flashes == 0` blinks until another pattern replaces this one.
    Flash {
        color: Color,
        period_ms: u32,
        flashes: u32,
        end_color: Color,
    },

    /// Fill pixels one at a time over `duration_ms`.
    Wipe { color: Color, duration_ms: u32 },

    /// Slow breathing animation used while the box is idle.
    Pulse { color: Color, period_ms: u32 },
}

impl LedPattern {
    pub fn solid(color: Color) -> Self {
        Self::Solid { color }
    }

    /// Blink until replaced.
    pub fn blink(color: Color, period_ms: u32) -> Self {
        Self::Flash {
            color,
            period_ms,
            flashes: 0,
            end_color: color,
        }
    }

    /// The color the array shows once any animation has finished.
    pub fn resting_color(&self) -> Color {
        match self {
            Self::Off => Color::BLACK,
            Self::Solid { color } | Self::Wipe { color, .. } | Self::Pulse { color, .. } => *color,
            Self::Flash { end_color, .. } => *end_color,
        }
    }
}

/// What the buzzer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuzzPattern {
    /// Silence; also stops a repeating pattern.
    Off,

    /// One tone of the given length.
    Beep { duration_ms: u32 },

    /// Tone/silence cycles. `count == 0` repeats until replaced.
    Repeat { on_ms: u32, off_ms: u32, count: u32 },
}

impl BuzzPattern {
    pub fn beep(duration_ms: u32) -> Self {
        Self::Beep { duration_ms }
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("MFRC522", "SPI RFID Reader")
            .with_serial_number("123456789")
            .with_firmware_version("v2.0");

        assert_eq!(info.name, "MFRC522");
        assert_eq!(info.model, "SPI RFID Reader");
        assert_eq!(info.serial_number, Some("123456789".to_string()));
        assert_eq!(info.firmware_version, Some("v2.0".to_string()));
    }

    #[rstest]
    #[case("#00FF00", Color::GREEN)]
    #[case("DF2000", Color::ORANGE)]
    #[case(" #800080 ", Color::PURPLE)]
    #[case("#ffff00", Color::YELLOW)]
    fn test_color_parse(#[case] input: &str, #[case] expected: Color) {
        assert_eq!(input.parse::<Color>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("#FFF")]
    #[case("#GG0000")]
    #[case("#00FF00FF")]
    fn test_color_parse_invalid(#[case] input: &str) {
        assert!(input.parse::<Color>().is_err());
    }

    #[test]
    fn test_color_serializes_as_hex_string() {
        let json = serde_json::to_string(&Color::ORANGE).unwrap();
        assert_eq!(json, r##""#DF2000""##);
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::ORANGE);
    }

    #[test]
    fn test_led_pattern_resting_color() {
        assert_eq!(LedPattern::Off.resting_color(), Color::BLACK);
        assert_eq!(LedPattern::solid(Color::GREEN).resting_color(), Color::GREEN);
        let flash = LedPattern::Flash {
            color: Color::RED,
            period_ms: 100,
            flashes: 5,
            end_color: Color::BLACK,
        };
        assert_eq!(flash.resting_color(), Color::BLACK);
        assert_eq!(
            LedPattern::blink(Color::YELLOW, 200).resting_color(),
            Color::YELLOW
        );
    }

    #[test]
    fn test_led_pattern_serialization() {
        let json = serde_json::to_string(&LedPattern::solid(Color::GREEN)).unwrap();
        assert_eq!(json, r##"{"kind":"solid","color":"#00FF00"}"##);
    }

    #[test]
    fn test_buzz_pattern() {
        assert!(BuzzPattern::Off.is_silent());
        assert!(!BuzzPattern::beep(50).is_silent());
    }
}
