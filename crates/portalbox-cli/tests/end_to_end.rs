//! Controller, SQLite directory and audit log working together.

use std::time::Duration;

use portalbox_cli::audit::AuditLog;
use portalbox_cli::commands::discover_equipment;
use portalbox_cli::simulator::Simulator;
use portalbox_controller::{AccessController, ControllerConfig, StateKind, TracingEventLogger};
use portalbox_core::Badge;
use portalbox_storage::{
    Database, EventLogRepository, PolicyDefaults, SqliteDirectory, SqliteEquipmentRepository,
    SqliteEventLog, SqliteEventLogRepository,
};
use tokio_util::sync::CancellationToken;

const MAC: &str = "b827eb00beef";
const ADA: Badge = Badge::from_card_id(0x04AB_CDEF);
const STRANGER: Badge = Badge::from_card_id(0x0BAD_CAFE);

async fn seeded() -> Database {
    let db = Database::in_memory().await.unwrap();
    for statement in [
        "INSERT INTO equipment_types (id, name, requires_training, charge_policy_id) VALUES (2, 'Drill', 0, 1)",
        "INSERT INTO equipment (id, name, type_id, mac_address, timeout, max_session_minutes, in_service)
            VALUES (5, 'Drill Press', 2, 'b827eb00beef', 10, 60, 1)",
        "INSERT INTO users (id, name, balance) VALUES (1, 'Ada', 0)",
        "INSERT INTO cards (id, type_id) VALUES (78368239, 4)",
        "INSERT INTO users_x_cards (user_id, card_id) VALUES (1, 78368239)",
    ] {
        sqlx::query(statement).execute(db.pool()).await.unwrap();
    }
    db
}

#[tokio::test]
async fn test_badge_session_is_authorized_and_audited_in_database() {
    let db = seeded().await;
    let profile = discover_equipment(
        &SqliteEquipmentRepository::new(db.pool().clone()),
        MAC,
        Duration::from_millis(10),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(profile.name, "Drill Press");

    let audit = AuditLog::Database((SqliteEventLog::new(&db, Some(profile.id)), TracingEventLogger));
    let directory = SqliteDirectory::new(&db, profile, PolicyDefaults::default());
    let (simulator, devices) = Simulator::new();
    let config = ControllerConfig {
        poll_interval_ms: 10,
        debounce_window_ms: 50,
        ..ControllerConfig::default()
    };
    let mut controller = AccessController::new(
        config,
        devices.reader,
        devices.button,
        devices.outputs,
        directory,
        audit,
    )
    .unwrap();
    controller.start().await;

    simulator.card.present(ADA);
    assert_eq!(controller.tick().await, StateKind::Active);
    assert!(simulator.outputs.relay_energized());
    let session = controller.session().unwrap();
    assert_eq!(session.policy().idle_timeout, Duration::from_secs(600));

    simulator.card.remove();
    let mut state = StateKind::Active;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        state = controller.tick().await;
        if state == StateKind::Idle {
            break;
        }
    }
    assert_eq!(state, StateKind::Idle);
    assert!(!simulator.outputs.relay_energized());

    simulator.card.present(STRANGER);
    assert_eq!(controller.tick().await, StateKind::Idle);
    assert!(!simulator.outputs.relay_energized());

    let mut names: Vec<String> = SqliteEventLogRepository::new(db.pool().clone())
        .recent(20)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.event)
        .collect();
    names.reverse();
    assert_eq!(
        names,
        [
            "started",
            "badge_presented",
            "access_granted",
            "session_ended_removed",
            "badge_presented",
            "access_denied",
        ]
    );
}
