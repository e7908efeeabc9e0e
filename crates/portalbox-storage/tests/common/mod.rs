//! Fixture shop shared by the storage integration tests.

#![allow(dead_code)]

use portalbox_core::Badge;
use portalbox_storage::Database;

pub const LASER_MAC: &str = "b8:27:eb:00:00:01";
pub const PRINTER_MAC: &str = "b8:27:eb:00:00:02";
pub const LATHE_MAC: &str = "b8:27:eb:00:00:03";

/// Trained, funded user.
pub const ADA: Badge = Badge::from_card_id(0x04AB_CDEF);
/// Untrained user with a positive balance.
pub const BOB: Badge = Badge::from_card_id(0x0000_1002);
/// Trained user with an empty balance.
pub const CY: Badge = Badge::from_card_id(0x0000_1003);
/// Inactive account, trained and funded.
pub const DEE: Badge = Badge::from_card_id(0x0000_1004);
/// Proxy card.
pub const PROXY: Badge = Badge::from_card_id(0x0000_2001);
/// User card that was never handed out.
pub const SPARE: Badge = Badge::from_card_id(0x0000_3001);
/// Not in the database at all.
pub const STRANGER: Badge = Badge::from_card_id(0x0BAD_CAFE);

/// Equipment:
/// - Laser Cutter: training required, charged, timeout 5 min, max 60 min
/// - 3D Printer: no training, charged, limits from defaults
/// - Lathe: training required, free, out of service
pub async fn shop() -> Database {
    let db = Database::in_memory().await.unwrap();
    let statements = [
        "INSERT INTO locations (id, name) VALUES (1, 'Maker Lab')",
        "INSERT INTO equipment_types (id, name, requires_training, charge_policy_id) VALUES
            (2, 'Laser', 1, 3),
            (3, 'Printer', 0, 4),
            (4, 'Lathe', 1, 1)",
        "INSERT INTO equipment (id, name, type_id, mac_address, location_id, timeout, max_session_minutes, in_service) VALUES
            (10, 'Laser Cutter', 2, 'b827eb000001', 1, 5, 60, 1),
            (11, '3D Printer', 3, 'b827eb000002', 1, 0, 0, 1),
            (12, 'Lathe', 4, 'b827eb000003', NULL, 0, 0, 0)",
        "INSERT INTO users (id, name, email, balance, is_active) VALUES
            (1, 'Ada', 'ada@example.edu', 25.0, 1),
            (2, 'Bob', NULL, 10.0, 1),
            (3, 'Cy', 'cy@example.edu', 0.0, 1),
            (4, 'Dee', NULL, 40.0, 0)",
        "INSERT INTO cards (id, type_id) VALUES
            (78368239, 4), (4098, 4), (4099, 4), (4100, 4), (8193, 2), (12289, 4)",
        "INSERT INTO users_x_cards (user_id, card_id) VALUES
            (1, 78368239), (2, 4098), (3, 4099), (4, 4100)",
        "INSERT INTO authorizations (user_id, equipment_type_id) VALUES
            (1, 2), (1, 4), (3, 2), (4, 2)",
    ];
    for statement in statements {
        sqlx::query(statement).execute(db.pool()).await.unwrap();
    }
    db
}
