#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::CardHolder;
use sqlx::SqlitePool;

/// Card and card-holder lookups used by the authorization directory.
///
/// Cards are keyed by their numeric UID (`Badge::card_id`).
pub trait CardRepository: Send + Sync {
    /// Raw `card_types.id` of the card, if the card is known.
    async fn card_type_id(&self, card_id: u32) -> StorageResult<Option<i64>>;

    /// User the card is registered to.
    async fn holder(&self, card_id: u32) -> StorageResult<Option<CardHolder>>;

    /// Whether the user holds a training authorization for the equipment type.
    async fn is_authorized_for(&self, user_id: i64, equipment_type_id: i64)
    -> StorageResult<bool>;
}

/// SQLite implementation of CardRepository
pub struct SqliteCardRepository {
    pool: SqlitePool,
}

impl SqliteCardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CardRepository for SqliteCardRepository {
    async fn card_type_id(&self, card_id: u32) -> StorageResult<Option<i64>> {
        let type_id = sqlx::query_scalar::<_, i64>("SELECT type_id FROM cards WHERE id = ?")
            .bind(i64::from(card_id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(type_id)
    }

    async fn holder(&self, card_id: u32) -> StorageResult<Option<CardHolder>> {
        let holder = sqlx::query_as::<_, CardHolder>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, u.balance, u.is_active
            FROM users_x_cards uxc
            JOIN users u ON uxc.user_id = u.id
            WHERE uxc.card_id = ?
            "#,
        )
        .bind(i64::from(card_id))
        .fetch_optional(&self.pool)
        .await?;
        Ok(holder)
    }

    async fn is_authorized_for(
        &self,
        user_id: i64,
        equipment_type_id: i64,
    ) -> StorageResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM authorizations WHERE user_id = ? AND equipment_type_id = ?",
        )
        .bind(user_id)
        .bind(equipment_type_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}
