//! Configuration for satellite-automate
//!
//! The config file is a TOML document with a single `[satellite]` table
//! holding the server connection settings. Per-run options come from the
//! CLI and are carried in an explicit [`RunOptions`] value; there is no
//! ambient global settings object.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

use crate::core::error::SatelliteError;
use crate::core::version::VersionPolicy;

/// Connection settings for the Satellite server
#[derive(Debug, Deserialize)]
pub struct SatelliteConfig {
    /// Base URL of the server, e.g. "https://satellite.example.com"
    pub url: String,

    /// Organization label
    pub org: String,

    pub username: String,

    pub password: SecretString,

    /// Numbering policy for auto-published versions
    #[serde(default)]
    pub version_policy: VersionPolicy,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    satellite: SatelliteConfig,
}

impl SatelliteConfig {
    /// Load the `[satellite]` table from a TOML config file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, SatelliteError> {
        let path = path.as_ref();
        let config_load = |message: String| SatelliteError::ConfigLoad {
            path: path.display().to_string(),
            message,
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| config_load(e.to_string()))?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|e| config_load(e.to_string()))?;

        Ok(file.satellite)
    }
}

/// Per-run options taken from the CLI
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker count for concurrent repository fetches
    pub threads: usize,

    /// Degrade blocking publish checks to warnings, force promotes
    pub force: bool,

    /// Block until the server-side task reaches a terminal state
    pub wait: bool,

    /// Explicit "major.minor" version instead of the computed one
    pub version: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            threads: 10,
            force: false,
            wait: false,
            version: None,
        }
    }
}
