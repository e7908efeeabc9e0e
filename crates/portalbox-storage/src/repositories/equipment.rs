#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{EquipmentProfile, normalize_mac};
use sqlx::SqlitePool;
use tracing::info;

/// Name given to a box that registers itself before an operator sets it up.
pub const NEW_BOX_NAME: &str = "New Portal Box";

/// Equipment type assigned to newly registered boxes.
pub const NEW_BOX_TYPE_ID: i64 = 1;

/// Equipment lookups and self-registration, keyed by the box MAC address.
///
/// MAC arguments are normalized with [`normalize_mac`] before use.
pub trait EquipmentRepository: Send + Sync {
    /// Profile of the equipment this box controls, if registered.
    async fn find_by_mac(&self, mac: &str) -> StorageResult<Option<EquipmentProfile>>;

    async fn is_registered(&self, mac: &str) -> StorageResult<bool>;

    /// Insert an out-of-service placeholder record for this box and return
    /// its id. Registering an already registered box is an error.
    async fn register(&self, mac: &str) -> StorageResult<i64>;
}

/// SQLite implementation of EquipmentRepository
pub struct SqliteEquipmentRepository {
    pool: SqlitePool,
}

impl SqliteEquipmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EquipmentRepository for SqliteEquipmentRepository {
    async fn find_by_mac(&self, mac: &str) -> StorageResult<Option<EquipmentProfile>> {
        let mac = normalize_mac(mac)?;
        let profile = sqlx::query_as::<_, EquipmentProfile>(
            r#"
            SELECT e.id, e.name, e.mac_address, e.type_id, t.name AS type_name,
                   e.location_id, l.name AS location_name,
                   e.timeout AS timeout_minutes, e.max_session_minutes, e.in_service,
                   t.requires_training, t.charge_policy_id
            FROM equipment e
            JOIN equipment_types t ON e.type_id = t.id
            LEFT JOIN locations l ON e.location_id = l.id
            WHERE e.mac_address = ?
            "#,
        )
        .bind(&mac)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn is_registered(&self, mac: &str) -> StorageResult<bool> {
        let mac = normalize_mac(mac)?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE mac_address = ?")
            .bind(&mac)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn register(&self, mac: &str) -> StorageResult<i64> {
        let mac = normalize_mac(mac)?;
        if self.is_registered(&mac).await? {
            return Err(StorageError::validation(format!(
                "box {mac} is already registered"
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO equipment (name, type_id, mac_address, location_id, in_service)
            VALUES (?, ?, ?, NULL, 0)
            "#,
        )
        .bind(NEW_BOX_NAME)
        .bind(NEW_BOX_TYPE_ID)
        .bind(&mac)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(mac = %mac, equipment_id = id, "Registered new box");
        Ok(id)
    }
}
