//! SQLite storage for the PortalBox equipment access controller.
//!
//! The database is shared by every box in a shop. Each box looks itself up
//! by MAC address to find the equipment it controls, asks the directory
//! whether a badge may use that equipment, and appends its audit trail to
//! the common `log` table.
//!
//! - [`Database`] - connection pool with embedded migrations
//! - [`SqliteDirectory`] - [`AuthorizationClient`](portalbox_core::AuthorizationClient)
//!   implementation
//! - [`SqliteEventLog`] - [`EventLogger`](portalbox_core::EventLogger)
//!   implementation
//! - [`repositories`] - the queries behind both
//!
//! # Example
//!
//! ```no_run
//! use portalbox_storage::{Database, DatabaseConfig, PolicyDefaults, SqliteDirectory, SqliteEventLog};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("portalbox.db")).await?;
//! let directory = SqliteDirectory::for_box(&db, "b8:27:eb:12:34:56", PolicyDefaults::default()).await?;
//! let log = SqliteEventLog::new(&db, Some(directory.equipment().id));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod directory;
pub mod error;
pub mod event_log;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use directory::SqliteDirectory;
pub use error::{StorageError, StorageResult};
pub use event_log::SqliteEventLog;
pub use models::{CardHolder, CardType, EquipmentProfile, LogEntry, PolicyDefaults, normalize_mac};
pub use repositories::{
    CardRepository, EquipmentRepository, EventLogRepository, SqliteCardRepository,
    SqliteEquipmentRepository, SqliteEventLogRepository,
};
