//! Core domain types for the PortalBox equipment access controller.
//!
//! This crate holds what every other crate agrees on: the badge identifier,
//! equipment policy, authorization results, audit events, the error taxonomy,
//! and the two capability traits the controller consumes from the outside
//! world ([`AuthorizationClient`] and [`EventLogger`]).

pub mod constants;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use events::{AccessEvent, EventContext};
pub use traits::{AuthorizationClient, EventLogger, NullEventLogger};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
