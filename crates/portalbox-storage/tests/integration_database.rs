//! Database connection and migrations.

use portalbox_storage::{Database, DatabaseConfig};

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_file_database_creates_parent_directory_and_migrates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("var/lib/portalbox/box.db");

    let db = Database::new(DatabaseConfig::new(path.to_string_lossy()).max_connections(2))
        .await
        .unwrap();
    db.health_check().await.unwrap();

    let card_types: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM card_types")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(card_types, 4);
    db.close().await;

    assert!(path.exists());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();

    let event_types: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_types")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(event_types, 13);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_connecting() {
    let config = DatabaseConfig::new("unused.db").max_connections(0);
    assert!(Database::new(config).await.is_err());
}
