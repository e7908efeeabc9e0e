//! Audit trail persistence.

mod common;

use common::*;
use portalbox_core::{AccessEvent, DenialReason, EventContext, EventLogger};
use portalbox_storage::{EventLogRepository, SqliteEventLog};

#[tokio::test]
async fn test_events_are_appended_with_context() {
    let db = shop().await;
    let mut log = SqliteEventLog::new(&db, Some(10));

    log.record(
        &AccessEvent::BadgePresented,
        &EventContext::new("Authorizing").with_badge(ADA),
    )
    .await;
    log.record(
        &AccessEvent::AccessDenied {
            reason: DenialReason::NotAuthorized,
        },
        &EventContext::new("Idle").with_badge(BOB),
    )
    .await;
    log.record(
        &AccessEvent::CardLeftInReader,
        &EventContext::new("Idle")
            .with_badge(ADA)
            .with_equipment("Laser Cutter")
            .with_message("Your card was left in the Laser Cutter"),
    )
    .await;

    let entries = log.repository().recent(10).await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(
        names,
        ["card_left_in_reader", "access_denied", "badge_presented"]
    );

    let denied = &entries[1];
    assert_eq!(denied.equipment_id, Some(10));
    assert_eq!(denied.card_id, Some(i64::from(BOB.card_id())));
    assert_eq!(denied.state, "Idle");
    assert_eq!(denied.detail.as_deref(), Some("not_authorized"));

    assert_eq!(
        entries[0].message.as_deref(),
        Some("Your card was left in the Laser Cutter")
    );
}

#[tokio::test]
async fn test_unknown_cards_and_boxes_are_still_logged() {
    let db = shop().await;
    let mut log = SqliteEventLog::new(&db, None);

    log.record(
        &AccessEvent::AccessDenied {
            reason: DenialReason::UnknownCard,
        },
        &EventContext::new("Idle").with_badge(STRANGER),
    )
    .await;
    log.record(&AccessEvent::Shutdown, &EventContext::new("ShuttingDown"))
        .await;

    let repo = log.repository();
    assert_eq!(repo.count_by_event("access_denied").await.unwrap(), 1);
    assert_eq!(repo.count_by_event("shutdown").await.unwrap(), 1);

    let latest = repo.recent(1).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].card_id, None);
    assert_eq!(latest[0].equipment_id, None);
}

#[tokio::test]
async fn test_every_event_kind_has_an_event_type() {
    let db = shop().await;
    let mut log = SqliteEventLog::new(&db, Some(11));
    let events = [
        AccessEvent::Started,
        AccessEvent::BadgePresented,
        AccessEvent::AccessGranted,
        AccessEvent::AccessDenied {
            reason: DenialReason::Other("x".into()),
        },
        AccessEvent::AuthorizationUnreachable { attempts: 3 },
        AccessEvent::SessionEndedRemoved,
        AccessEvent::SessionEndedTimeout,
        AccessEvent::SessionEndedMaxDuration,
        AccessEvent::SessionEndedShutdown,
        AccessEvent::CardLeftInReader,
        AccessEvent::HardwareFault {
            detail: "relay".into(),
        },
        AccessEvent::FaultCleared,
        AccessEvent::Shutdown,
    ];
    for event in &events {
        log.record(event, &EventContext::new("Idle")).await;
    }

    assert_eq!(log.repository().recent(100).await.unwrap().len(), events.len());
}

#[tokio::test]
async fn test_write_failure_is_swallowed() {
    let db = shop().await;
    let mut log = SqliteEventLog::new(&db, Some(10));
    db.close().await;

    log.record(&AccessEvent::Started, &EventContext::new("Idle"))
        .await;
}
