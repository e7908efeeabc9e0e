use crate::error::{StorageError, StorageResult};
use portalbox_core::EquipmentPolicy;
use portalbox_core::constants::{DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_SESSION_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Charge policies at or below this id do not bill the user.
const LAST_FREE_CHARGE_POLICY: i64 = 2;

/// Equipment record for one box, joined with its type and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EquipmentProfile {
    pub id: i64,
    pub name: String,
    pub mac_address: String,
    pub type_id: i64,
    pub type_name: String,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    /// Idle timeout in minutes; 0 uses the configured default
    pub timeout_minutes: i64,
    /// Session limit in minutes; 0 uses the configured default
    pub max_session_minutes: i64,
    pub in_service: bool,
    pub requires_training: bool,
    pub charge_policy_id: i64,
}

impl EquipmentProfile {
    /// Whether using this equipment is billed to the user's balance.
    pub fn requires_payment(&self) -> bool {
        self.charge_policy_id > LAST_FREE_CHARGE_POLICY
    }

    /// Session policy handed to the controller on a grant.
    pub fn policy(&self, defaults: &PolicyDefaults) -> EquipmentPolicy {
        EquipmentPolicy::new(
            self.name.clone(),
            minutes_or(self.max_session_minutes, defaults.max_session()),
            minutes_or(self.timeout_minutes, defaults.idle_timeout()),
        )
    }
}

fn minutes_or(minutes: i64, fallback: Duration) -> Duration {
    match u64::try_from(minutes) {
        Ok(0) | Err(_) => fallback,
        Ok(m) => Duration::from_secs(m.saturating_mul(60)),
    }
}

/// Session limits applied when an equipment record leaves them at 0.
///
/// A default of 0 means the limit is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaults {
    pub idle_timeout_secs: u64,
    pub max_session_secs: u64,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_session_secs: DEFAULT_MAX_SESSION_SECS,
        }
    }
}

impl PolicyDefaults {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_session(&self) -> Duration {
        Duration::from_secs(self.max_session_secs)
    }
}

/// Canonical form of a box MAC address: 12 lowercase hex digits, no
/// separators.
///
/// ```
/// use portalbox_storage::models::normalize_mac;
///
/// assert_eq!(normalize_mac("B8:27:EB:12:34:56").unwrap(), "b827eb123456");
/// ```
pub fn normalize_mac(mac: &str) -> StorageResult<String> {
    let digits: String = mac
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect::<String>()
        .to_ascii_lowercase();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StorageError::validation(format!(
            "invalid MAC address: {mac:?}"
        )));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn profile(timeout_minutes: i64, max_session_minutes: i64) -> EquipmentProfile {
        EquipmentProfile {
            id: 7,
            name: "Laser Cutter".into(),
            mac_address: "b827eb123456".into(),
            type_id: 2,
            type_name: "Laser".into(),
            location_id: None,
            location_name: None,
            timeout_minutes,
            max_session_minutes,
            in_service: true,
            requires_training: true,
            charge_policy_id: 1,
        }
    }

    #[test]
    fn test_policy_uses_profile_minutes() {
        let policy = profile(5, 60).policy(&PolicyDefaults::default());
        assert_eq!(policy.equipment_name, "Laser Cutter");
        assert_eq!(policy.idle_timeout, Duration::from_secs(300));
        assert_eq!(policy.max_session, Duration::from_secs(3600));
    }

    #[test]
    fn test_policy_zero_falls_back_to_defaults() {
        let defaults = PolicyDefaults {
            idle_timeout_secs: 900,
            max_session_secs: 0,
        };
        let policy = profile(0, 0).policy(&defaults);
        assert_eq!(policy.idle_timeout, Duration::from_secs(900));
        assert!(!policy.has_max_session());
    }

    #[rstest]
    #[case(1, false)]
    #[case(2, false)]
    #[case(3, true)]
    #[case(4, true)]
    fn test_requires_payment(#[case] charge_policy_id: i64, #[case] expected: bool) {
        let mut p = profile(0, 0);
        p.charge_policy_id = charge_policy_id;
        assert_eq!(p.requires_payment(), expected);
    }

    #[rstest]
    #[case("b827eb123456", "b827eb123456")]
    #[case("B8:27:EB:12:34:56", "b827eb123456")]
    #[case("b8-27-eb-12-34-56", "b827eb123456")]
    #[case("  B827EB123456\n", "b827eb123456")]
    fn test_normalize_mac(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_mac(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("b827eb12345")]
    #[case("b827eb1234567")]
    #[case("g827eb123456")]
    fn test_normalize_mac_rejects(#[case] input: &str) {
        assert!(matches!(
            normalize_mac(input),
            Err(StorageError::Validation(_))
        ));
    }
}
