//! Command-line interface.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

/// PortalBox equipment access controller.
///
/// Gates power to a piece of shared equipment on RFID badge authorization.
#[derive(Parser, Debug)]
#[command(name = "portalbox", version, about)]
pub struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "PORTALBOX_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the access controller, reading simulated peripheral events from stdin.
    Run(BoxArgs),
    /// Register this box in the database as an out-of-service placeholder.
    Register(BoxArgs),
    /// Validate the configuration file and print the effective settings.
    CheckConfig,
}

/// Overrides for the `[box]` and `[database]` sections.
#[derive(Args, Debug, Default, Clone)]
pub struct BoxArgs {
    /// MAC address this box is registered under
    #[arg(long, env = "PORTALBOX_MAC")]
    pub mac: Option<String>,

    /// SQLite database file
    #[arg(long, env = "PORTALBOX_DATABASE")]
    pub database: Option<PathBuf>,
}

impl BoxArgs {
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(mac) = &self.mac {
            config.portal_box.mac = Some(mac.clone());
        }
        if let Some(database) = &self.database {
            config.database.database_path = database.to_string_lossy().into_owned();
        }
        config.validate()
    }
}

impl Cli {
    /// Load the configuration file. A missing file at the default location
    /// means built-in defaults; a missing file given explicitly is an error.
    pub fn load_config(&self) -> Result<AppConfig> {
        if self.config == Path::new(DEFAULT_CONFIG_PATH) && !self.config.exists() {
            return Ok(AppConfig::default());
        }
        AppConfig::load(&self.config)
    }
}
