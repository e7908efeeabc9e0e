//! Subcommand implementations.

use std::time::Duration;

use anyhow::{Context, Result};
use portalbox_controller::{AccessController, TracingEventLogger};
use portalbox_storage::{
    Database, EquipmentProfile, EquipmentRepository, SqliteDirectory, SqliteEquipmentRepository,
    SqliteEventLog,
};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::simulator::{HELP, Simulator};
use crate::watchdog::Watchdog;

/// Wait until this box has an in-service equipment record.
///
/// An unregistered box registers itself as a placeholder; an operator then
/// assigns it a type and location and puts it in service. Returns `None` if
/// `cancel` fires first.
pub async fn discover_equipment<E: EquipmentRepository>(
    repository: &E,
    mac: &str,
    retry: Duration,
    cancel: &CancellationToken,
) -> Option<EquipmentProfile> {
    loop {
        match repository.find_by_mac(mac).await {
            Ok(Some(profile)) if profile.in_service => return Some(profile),
            Ok(Some(profile)) => info!(
                equipment_id = profile.id,
                name = %profile.name,
                "Box is registered but not in service; waiting for an operator"
            ),
            Ok(None) => match repository.register(mac).await {
                Ok(id) => info!(mac, equipment_id = id, "Registered box; waiting for an operator"),
                Err(err) => warn!(mac, error = %err, "Failed to register box"),
            },
            Err(err) => warn!(mac, error = %err, "Equipment lookup failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(retry) => {}
        }
    }
}

/// `portalbox run`
pub async fn run(config: AppConfig) -> Result<()> {
    let mac = config.portal_box.resolve_mac()?;
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let db = Database::new(config.database.clone())
        .await
        .context("Failed to open database")?;

    info!(mac = %mac, "Looking up equipment profile");
    let equipment = SqliteEquipmentRepository::new(db.pool().clone());
    let Some(profile) =
        discover_equipment(&equipment, &mac, config.portal_box.discovery_retry(), &shutdown).await
    else {
        info!("Shutdown requested before the box was put in service");
        db.close().await;
        return Ok(());
    };
    info!(
        equipment_id = profile.id,
        equipment = %profile.name,
        equipment_type = %profile.type_name,
        location = profile.location_name.as_deref().unwrap_or("unassigned"),
        "Equipment profile loaded"
    );

    let mut controller_config = config.controller.clone();
    controller_config
        .equipment_name
        .get_or_insert_with(|| profile.name.clone());

    let audit = if config.logging.audit_to_database {
        AuditLog::Database((SqliteEventLog::new(&db, Some(profile.id)), TracingEventLogger))
    } else {
        AuditLog::Tracing(TracingEventLogger)
    };
    info!(audit = audit.name(), "Audit log configured");

    let directory = SqliteDirectory::new(&db, profile, config.policy);
    let (simulator, devices) = Simulator::new();
    let mut controller = AccessController::new(
        controller_config,
        devices.reader,
        devices.button,
        devices.outputs,
        directory,
        audit,
    )
    .context("Invalid controller configuration")?
    .with_shutdown_token(shutdown.clone());

    let input = {
        let handle = controller.handle();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            simulator
                .drive(BufReader::new(tokio::io::stdin()), handle, cancel)
                .await;
        })
    };
    eprintln!("{HELP}");

    let mut watchdog = Watchdog::from_config(&config.watchdog);
    let final_state = controller
        .run_with(|state| {
            if let Some(watchdog) = watchdog.as_mut() {
                watchdog.feed(state, tokio::time::Instant::now());
            }
        })
        .await;

    shutdown.cancel();
    input.abort();
    db.close().await;
    info!(state = %final_state, "PortalBox stopped");
    Ok(())
}

/// `portalbox register`
pub async fn register(config: AppConfig) -> Result<()> {
    let mac = config.portal_box.resolve_mac()?;
    let db = Database::new(config.database.clone())
        .await
        .context("Failed to open database")?;
    let equipment = SqliteEquipmentRepository::new(db.pool().clone());

    if let Some(profile) = equipment.find_by_mac(&mac).await? {
        println!(
            "Box {mac} is already registered as equipment {} ({}, {})",
            profile.id,
            profile.name,
            if profile.in_service { "in service" } else { "out of service" }
        );
    } else {
        let id = equipment.register(&mac).await?;
        println!("Registered box {mac} as equipment {id}; set its type and location to put it in service");
    }

    db.close().await;
    Ok(())
}

/// `portalbox check-config`
pub fn check_config(config: &AppConfig) -> Result<()> {
    let mac = match config.portal_box.resolve_mac() {
        Ok(mac) => mac,
        Err(err) => format!("unresolved ({err:#})"),
    };
    let controller = &config.controller;
    println!("Configuration is valid");
    println!("  box MAC:         {mac}");
    println!("  database:        {}", config.database.database_path);
    println!("  poll interval:   {:?}", controller.poll_interval());
    println!("  debounce window: {:?}", controller.debounce_window());
    println!(
        "  authorization:   {} attempts, {:?} timeout each",
        controller.retry.max_attempts,
        controller.auth_timeout()
    );
    println!(
        "  policy defaults: idle {:?}, max session {:?}",
        config.policy.idle_timeout(),
        config.policy.max_session()
    );
    println!(
        "  audit log:       {}",
        if config.logging.audit_to_database { "database+tracing" } else { "tracing" }
    );
    if config.watchdog.enabled {
        println!("  watchdog:        {}", config.watchdog.path.display());
    }
    Ok(())
}

fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
