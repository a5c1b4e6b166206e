//! Dashboard configuration.
//!
//! Everything has a default, so the config file is optional. When present it
//! is a JSON object and any subset of keys may be given:
//! ```json
//! {
//!   "data": { "site_statistics": "data/site_statistics.json" },
//!   "google": { "timeout_secs": 5 },
//!   "fuel": { "rates": { "class-8-artic-5-axle": 31.0 } }
//! }
//! ```
//! The Google Maps API key is never stored here; it is read from
//! `GOOGLE_MAPS_API_KEY` (a `.env` file is honoured).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::estimate::FuelModel;

/// Environment variable holding the Google Maps API key.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataPaths,
    pub google: GoogleConfig,
    pub server: ServerConfig,
    pub fuel: FuelModel,
}

/// Locations of the five input files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub site_statistics: PathBuf,
    pub hydrogen_stations: PathBuf,
    pub railway: PathBuf,
    pub freight_roads: PathBuf,
    pub secondary_roads: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            site_statistics: PathBuf::from("site_statistics.json"),
            hydrogen_stations: PathBuf::from("hydrogen_refuelling_stations.csv"),
            railway: PathBuf::from("key_freight_route_rail.geojson"),
            freight_roads: PathBuf::from("key_freight_route_road.geojson"),
            secondary_roads: PathBuf::from("secondary_route.geojson"),
        }
    }
}

impl DataPaths {
    /// Resolves every relative path against `dir`.
    pub fn within(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            site_statistics: dir.join(defaults.site_statistics),
            hydrogen_stations: dir.join(defaults.hydrogen_stations),
            railway: dir.join(defaults.railway),
            freight_roads: dir.join(defaults.freight_roads),
            secondary_roads: dir.join(defaults.secondary_roads),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl GoogleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Reads the Google Maps API key from the environment. Blank values count as
/// unset.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
