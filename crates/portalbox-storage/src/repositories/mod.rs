pub mod card;
pub mod equipment;
pub mod event_log;

pub use card::{CardRepository, SqliteCardRepository};
pub use equipment::{EquipmentRepository, SqliteEquipmentRepository};
pub use event_log::{EventLogRepository, SqliteEventLogRepository};
