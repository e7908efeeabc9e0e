use crate::{Result, constants::BADGE_UID_LEN, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;

/// Badge identifier read from an RFID card (4 bytes, MSB first).
///
/// A badge lives only for the duration of one authorization attempt or one
/// session; it is never mutated once read.
///
/// # Security
/// Equality uses constant-time comparison so that matching a presented badge
/// against the session badge does not leak where the UIDs differ.
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
pub struct Badge([u8; BADGE_UID_LEN]);

impl Badge {
    /// Create a badge from its raw UID bytes.
    pub const fn new(uid: [u8; BADGE_UID_LEN]) -> Self {
        Self(uid)
    }

    /// Create a badge from a UID slice reported by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidBadge` if the slice is not exactly
    /// [`BADGE_UID_LEN`] bytes long.
    pub fn from_slice(uid: &[u8]) -> Result<Self> {
        let bytes: [u8; BADGE_UID_LEN] = uid.try_into().map_err(|_| {
            Error::InvalidBadge(format!(
                "UID must be {BADGE_UID_LEN} bytes, got {}",
                uid.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Create a badge from the directory's numeric card id.
    pub const fn from_card_id(card_id: u32) -> Self {
        Self(card_id.to_be_bytes())
    }

    /// Numeric card id as stored by the directory.
    #[must_use]
    pub const fn card_id(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Raw UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// UID as an uppercase hexadecimal string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Badge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Badge({})", self.to_hex())
    }
}

impl std::str::FromStr for Badge {
    type Err = Error;

    /// Parse a badge from hex (`04ABCDEF`, optional `0x` prefix) or from a
    /// decimal card id (`#16909060`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(decimal) = s.strip_prefix('#') {
            let id: u32 = decimal
                .parse()
                .map_err(|_| Error::InvalidBadge(format!("Invalid card id: {decimal}")))?;
            return Ok(Self::from_card_id(id));
        }

        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if hex.len() != BADGE_UID_LEN * 2 || !hex.is_ascii() {
            return Err(Error::InvalidBadge(format!(
                "Expected {} hex digits, got {s:?}",
                BADGE_UID_LEN * 2
            )));
        }

        let mut bytes = [0u8; BADGE_UID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidBadge(format!("Invalid hex in {s:?}")))?;
        }
        Ok(Self(bytes))
    }
}

impl PartialEq for Badge {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::hash::Hash for Badge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Equipment-specific timing rules and identity.
///
/// Owned by the authorization directory; the controller keeps a read-only
/// snapshot for the lifetime of a session. A zero duration disables the
/// corresponding limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentPolicy {
    /// Human-readable equipment name (e.g. "Laser Cutter").
    pub equipment_name: String,

    /// Hard cap on a session, regardless of activity.
    pub max_session: Duration,

    /// Session ends when no activity has been seen for this long.
    pub idle_timeout: Duration,
}

impl EquipmentPolicy {
    pub fn new(equipment_name: impl Into<String>, max_session: Duration, idle_timeout: Duration) -> Self {
        Self {
            equipment_name: equipment_name.into(),
            max_session,
            idle_timeout,
        }
    }

    /// A policy without any time limits.
    pub fn unlimited(equipment_name: impl Into<String>) -> Self {
        Self::new(equipment_name, Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn has_max_session(&self) -> bool {
        !self.max_session.is_zero()
    }

    #[must_use]
    pub fn has_idle_timeout(&self) -> bool {
        !self.idle_timeout.is_zero()
    }
}

/// Why the directory refused a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Badge is not registered in the directory.
    UnknownCard,

    /// Badge is registered but is not a user card (proxy, training, shutdown).
    NotUserCard,

    /// Card holder lacks the training authorization for this equipment type.
    NotAuthorized,

    /// Equipment is charged and the card holder's balance is not positive.
    InsufficientBalance,

    /// Directory-specific reason.
    Other(String),
}

impl DenialReason {
    /// Stable identifier used in audit records.
    pub fn code(&self) -> &str {
        match self {
            Self::UnknownCard => "unknown_card",
            Self::NotUserCard => "not_user_card",
            Self::NotAuthorized => "not_authorized",
            Self::InsufficientBalance => "insufficient_balance",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCard => write!(f, "unknown card"),
            Self::NotUserCard => write!(f, "not a user card"),
            Self::NotAuthorized => write!(f, "not authorized for this equipment"),
            Self::InsufficientBalance => write!(f, "insufficient balance"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Outcome of one authorization query.
///
/// Produced once per badge presentation and never mutated. `Unreachable`
/// covers every transport failure and timeout; it is never interpreted as
/// permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuthorizationResult {
    Granted { policy: EquipmentPolicy },
    Denied { reason: DenialReason },
    Unreachable,
}

impl AuthorizationResult {
    pub fn granted(policy: EquipmentPolicy) -> Self {
        Self::Granted { policy }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Self::Denied { reason }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

impl fmt::Display for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted { policy } => write!(f, "granted ({})", policy.equipment_name),
            Self::Denied { reason } => write!(f, "denied ({reason})"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}
