pub mod card;
pub mod equipment;
pub mod log_entry;

pub use card::{CardHolder, CardType};
pub use equipment::{EquipmentProfile, PolicyDefaults, normalize_mac};
pub use log_entry::LogEntry;
