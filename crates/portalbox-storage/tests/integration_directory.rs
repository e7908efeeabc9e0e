//! Authorization rules against a seeded in-memory database.

mod common;

use std::time::Duration;

use common::*;
use portalbox_core::{AuthorizationClient, AuthorizationResult, Badge, DenialReason};
use portalbox_storage::{Database, PolicyDefaults, SqliteDirectory, StorageError};
use rstest::rstest;

async fn directory(db: &Database, mac: &str) -> SqliteDirectory {
    let defaults = PolicyDefaults {
        idle_timeout_secs: 900,
        max_session_secs: 0,
    };
    SqliteDirectory::for_box(db, mac, defaults).await.unwrap()
}

#[tokio::test]
async fn test_trained_funded_user_is_granted_equipment_policy() {
    let db = shop().await;
    let mut laser = directory(&db, LASER_MAC).await;

    let AuthorizationResult::Granted { policy } = laser.authorize(&ADA).await else {
        panic!("expected a grant");
    };
    assert_eq!(policy.equipment_name, "Laser Cutter");
    assert_eq!(policy.idle_timeout, Duration::from_secs(5 * 60));
    assert_eq!(policy.max_session, Duration::from_secs(60 * 60));
}

#[tokio::test]
async fn test_unset_limits_fall_back_to_defaults() {
    let db = shop().await;
    let mut printer = directory(&db, PRINTER_MAC).await;

    let AuthorizationResult::Granted { policy } = printer.authorize(&BOB).await else {
        panic!("expected a grant");
    };
    assert_eq!(policy.idle_timeout, Duration::from_secs(900));
    assert!(!policy.has_max_session());
}

#[rstest]
#[case::untrained(LASER_MAC, BOB, DenialReason::NotAuthorized)]
#[case::no_balance(LASER_MAC, CY, DenialReason::InsufficientBalance)]
#[case::no_balance_untrained_type(PRINTER_MAC, CY, DenialReason::InsufficientBalance)]
#[case::inactive_account(LASER_MAC, DEE, DenialReason::NotAuthorized)]
#[case::proxy_card(LASER_MAC, PROXY, DenialReason::NotUserCard)]
#[case::unassigned_card(LASER_MAC, SPARE, DenialReason::UnknownCard)]
#[case::unknown_card(PRINTER_MAC, STRANGER, DenialReason::UnknownCard)]
#[case::out_of_service(LATHE_MAC, ADA, DenialReason::Other("equipment out of service".into()))]
#[tokio::test]
async fn test_denials(#[case] mac: &str, #[case] badge: Badge, #[case] reason: DenialReason) {
    let db = shop().await;
    let mut box_directory = directory(&db, mac).await;
    assert_eq!(
        box_directory.authorize(&badge).await,
        AuthorizationResult::denied(reason)
    );
}

#[tokio::test]
async fn test_closed_database_is_unreachable_not_denied() {
    let db = shop().await;
    let mut laser = directory(&db, LASER_MAC).await;
    db.close().await;

    assert_eq!(laser.authorize(&ADA).await, AuthorizationResult::Unreachable);
    assert!(matches!(
        laser.decide(&ADA).await,
        Err(StorageError::Database(_))
    ));
}

#[tokio::test]
async fn test_unregistered_box_has_no_directory() {
    let db = shop().await;
    let result = SqliteDirectory::for_box(&db, "b8:27:eb:ff:ff:ff", PolicyDefaults::default()).await;
    assert!(matches!(result, Err(err) if err.is_not_found()));
}

#[tokio::test]
async fn test_user_for_card() {
    let db = shop().await;
    let laser = directory(&db, LASER_MAC).await;

    let ada = laser.user_for_card(&ADA).await.unwrap().unwrap();
    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.email.as_deref(), Some("ada@example.edu"));
    assert!(ada.has_positive_balance());

    assert!(laser.user_for_card(&PROXY).await.unwrap().is_none());
    assert!(laser.user_for_card(&STRANGER).await.unwrap().is_none());
}

#[tokio::test]
async fn test_equipment_profile_is_joined() {
    let db = shop().await;
    let laser = directory(&db, LASER_MAC).await;
    let profile = laser.equipment();

    assert_eq!(profile.id, 10);
    assert_eq!(profile.type_name, "Laser");
    assert_eq!(profile.location_name.as_deref(), Some("Maker Lab"));
    assert!(profile.requires_training);
    assert!(profile.requires_payment());
    assert!(profile.in_service);
}
