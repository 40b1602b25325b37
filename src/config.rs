//! Configuration for arduino-comm-logger.
//!
//! Session settings are always asked for interactively. The optional file
//! `~/.arduino-comm-logger/config.toml` only tunes the tool itself:
//!
//! ```toml
//! # Diagnostic log level (overridden by RUST_LOG)
//! log_level = "debug"
//!
//! [port]
//! # Prepended when the port is entered as a bare number
//! prefix = "/dev/ttyUSB"
//! # Upper-case port names that are not numbers
//! uppercase = false
//! ```
//!
//! Missing keys fall back to the platform defaults: `COM` with upper-casing
//! on Windows, `/dev/ttyACM` without it elsewhere.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::session::PortNaming;

const APP_DIR: &str = ".arduino-comm-logger";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagnostic log filter, e.g. `info` or `arduino_comm_logger=debug`
    pub log_level: String,
    /// Port name handling
    pub port: PortConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: PortConfig::default(),
        }
    }
}

/// Port name configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub prefix: Option<String>,
    pub uppercase: Option<bool>,
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing file gives the defaults; an unreadable or invalid one is an error
    /// the caller can report before falling back.
    pub fn load() -> Result<Self, String> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                Self::parse(&content).map_err(|e| format!("Invalid {}: {}", path.display(), e))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Port naming with platform defaults filled in
    pub fn port_naming(&self) -> PortNaming {
        let default = PortNaming::platform_default();
        PortNaming {
            prefix: self.port.prefix.clone().unwrap_or(default.prefix),
            uppercase: self.port.uppercase.unwrap_or(default.uppercase),
        }
    }

    /// Directory holding the config file and the diagnostic log
    pub fn app_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(APP_DIR))
    }

    fn config_path() -> Option<PathBuf> {
        Self::app_dir().map(|dir| dir.join("config.toml"))
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
