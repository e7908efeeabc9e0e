//! Error types for hardware operations.
//!
//! Any of these reaching the access controller is a hardware fault: the
//! controller never retries an actuator or sensor failure, it locks out.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Card reader failure.
    #[error("Card read error: {message}")]
    CardReadError { message: String },

    /// Relay or interlock command failed.
    #[error("Relay error: {message}")]
    RelayError { message: String },

    /// LED array command failed.
    #[error("Display error: {message}")]
    DisplayError { message: String },

    /// Buzzer command failed.
    #[error("Buzzer error: {message}")]
    BuzzerError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new card read error.
    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardReadError {
            message: message.into(),
        }
    }

    /// Create a new relay error.
    pub fn relay(message: impl Into<String>) -> Self {
        Self::RelayError {
            message: message.into(),
        }
    }

    /// Create a new display error.
    pub fn display(message: impl Into<String>) -> Self {
        Self::DisplayError {
            message: message.into(),
        }
    }

    /// Create a new buzzer error.
    pub fn buzzer(message: impl Into<String>) -> Self {
        Self::BuzzerError {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for portalbox_core::Error {
    fn from(error: HardwareError) -> Self {
        portalbox_core::Error::HardwareFault(error.to_string())
    }
}
