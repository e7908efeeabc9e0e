//! `portalbox` command-line application.
//!
//! Wires the access controller to the SQLite directory and audit log, loads
//! configuration, installs logging and signal handling, and drives simulated
//! peripherals from stdin.

pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod simulator;
pub mod watchdog;

pub use cli::{BoxArgs, Cli, Command};
pub use config::AppConfig;
