use serde::{Deserialize, Serialize};

/// Kind of card stored in the `cards` table.
///
/// Only [`CardType::User`] cards can start a session. The other kinds are
/// operator cards handled outside the access controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Shutdown = 1,
    Proxy = 2,
    Training = 3,
    User = 4,
}

impl CardType {
    /// Map a `card_types.id` value; unknown ids yield `None`.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Shutdown),
            2 => Some(Self::Proxy),
            3 => Some(Self::Training),
            4 => Some(Self::User),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn is_user(self) -> bool {
        self == Self::User
    }
}

/// The user a card is registered to, with what the directory needs to
/// decide on access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardHolder {
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    /// Account balance for charged equipment
    pub balance: f64,
    pub is_active: bool,
}

impl CardHolder {
    pub fn has_positive_balance(&self) -> bool {
        self.balance > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, Some(CardType::Shutdown))]
    #[case(2, Some(CardType::Proxy))]
    #[case(3, Some(CardType::Training))]
    #[case(4, Some(CardType::User))]
    #[case(0, None)]
    #[case(5, None)]
    fn test_card_type_from_id(#[case] id: i64, #[case] expected: Option<CardType>) {
        assert_eq!(CardType::from_id(id), expected);
        if let Some(kind) = expected {
            assert_eq!(kind.id(), id);
        }
    }

    #[test]
    fn test_only_user_cards_are_user() {
        assert!(CardType::User.is_user());
        assert!(!CardType::Training.is_user());
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(-3.5, false)]
    #[case(0.01, true)]
    fn test_balance(#[case] balance: f64, #[case] positive: bool) {
        let holder = CardHolder {
            user_id: 1,
            name: "Ada".into(),
            email: None,
            balance,
            is_active: true,
        };
        assert_eq!(holder.has_positive_balance(), positive);
    }
}
