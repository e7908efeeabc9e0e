use thiserror::Error;

use crate::types::DenialReason;

#[derive(Error, Debug)]
pub enum Error {
    // Hardware errors
    #[error("Hardware fault: {0}")]
    HardwareFault(String),

    // Authorization errors
    #[error("Authorization service unreachable: {0}")]
    AuthorizationUnreachable(String),

    #[error("Access denied: {reason}")]
    AuthorizationDenied { reason: DenialReason },

    #[error("Invalid badge: {0}")]
    InvalidBadge(String),

    // State machine errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

impl Error {
    /// Whether retrying the failed operation may succeed.
    ///
    /// Only reachability failures are transient. Denials are final for the
    /// attempt and hardware faults escalate to lockout.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AuthorizationUnreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
