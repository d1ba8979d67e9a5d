//! Configuration loading from environment variables.

use core::str::FromStr;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aqi_structs::GeoLocation;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use tracing::info;

/// Default OpenWeather API base URL.
pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Default OpenWeather history API base URL.
pub const DEFAULT_OPENWEATHER_HISTORY_URL: &str = "https://history.openweathermap.org";

/// Where the feature store and model registry keep their objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Ephemeral in-process store, lost on exit.
    Memory,
    /// A directory on the local filesystem.
    Local(PathBuf),
}

impl StoreLocation {
    /// Parses `memory://`, `file:///abs/path` or a plain directory path.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == "memory://" || value == "memory:///" {
            Self::Memory
        } else if let Some(path) = value.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else {
            Self::Local(PathBuf::from(value))
        }
    }

    /// Opens an object store rooted at this location.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or opened.
    pub fn open(&self) -> Result<Arc<dyn ObjectStore>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemory::new())),
            Self::Local(path) => {
                std::fs::create_dir_all(path).with_context(|| {
                    format!("Failed to create store directory {}", path.display())
                })?;
                let store = LocalFileSystem::new_with_prefix(path)
                    .with_context(|| format!("Failed to open store at {}", path.display()))?;
                info!(path = %path.display(), "Opened local object store");
                Ok(Arc::new(store))
            }
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenWeather API key, only needed by commands that fetch data.
    pub openweather_api_key: Option<String>,

    /// OpenWeather API base URL.
    pub openweather_base_url: String,

    /// OpenWeather history API base URL.
    pub openweather_history_url: String,

    /// Location readings are fetched for.
    pub location: GeoLocation,

    /// Length of the trailing fetch window in days.
    pub window_days: u32,

    /// Root of the feature store and model registry.
    pub store: StoreLocation,

    /// Directory for the local feature cache.
    pub feature_cache_dir: PathBuf,

    /// Share of rows (chronologically first) used for training.
    pub train_ratio: f64,

    /// Minimum number of rows in each of the training and evaluation splits.
    pub min_rows_per_split: usize,

    /// Address the dashboard binds to.
    pub dashboard_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            openweather_base_url: DEFAULT_OPENWEATHER_BASE_URL.to_string(),
            openweather_history_url: DEFAULT_OPENWEATHER_HISTORY_URL.to_string(),
            location: GeoLocation::KARACHI,
            window_days: 30,
            store: StoreLocation::Local(PathBuf::from("aqi_store")),
            feature_cache_dir: PathBuf::from("aqi_cache"),
            train_ratio: 0.8,
            min_rows_per_split: 2,
            dashboard_addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `OPENWEATHER_API_KEY`: API key for openweathermap.org
    /// - `OPENWEATHER_BASE_URL`, `OPENWEATHER_HISTORY_URL`: API base URLs
    /// - `AQI_LATITUDE`, `AQI_LONGITUDE`: location (default: Karachi)
    /// - `AQI_WINDOW_DAYS`: trailing fetch window (default: 30)
    /// - `STORE_URL` or `STORE_PATH`: store root (default: `./aqi_store`)
    /// - `FEATURE_CACHE_DIR`: local feature cache (default: `./aqi_cache`)
    /// - `AQI_TRAIN_RATIO`: chronological split ratio (default: 0.8)
    /// - `AQI_MIN_ROWS_PER_SPLIT`: minimum rows per split (default: 2)
    /// - `AQI_DASHBOARD_ADDR`: dashboard bind address (default: `127.0.0.1:8501`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let openweather_api_key = std::env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let location = GeoLocation::new(
            env_or("AQI_LATITUDE", defaults.location.latitude)?,
            env_or("AQI_LONGITUDE", defaults.location.longitude)?,
        );
        anyhow::ensure!(location.is_valid(), "Invalid location {location}");

        let store = std::env::var("STORE_URL")
            .or_else(|_| std::env::var("STORE_PATH"))
            .map_or(defaults.store, |value| StoreLocation::parse(&value));

        let train_ratio: f64 = env_or("AQI_TRAIN_RATIO", defaults.train_ratio)?;
        anyhow::ensure!(
            train_ratio > 0.0 && train_ratio < 1.0,
            "AQI_TRAIN_RATIO must be between 0 and 1, got {train_ratio}"
        );

        Ok(Self {
            openweather_api_key,
            openweather_base_url: env_or("OPENWEATHER_BASE_URL", defaults.openweather_base_url)?,
            openweather_history_url: env_or(
                "OPENWEATHER_HISTORY_URL",
                defaults.openweather_history_url,
            )?,
            location,
            window_days: env_or("AQI_WINDOW_DAYS", defaults.window_days)?,
            store,
            feature_cache_dir: env_or("FEATURE_CACHE_DIR", defaults.feature_cache_dir)?,
            train_ratio,
            min_rows_per_split: env_or("AQI_MIN_ROWS_PER_SPLIT", defaults.min_rows_per_split)?,
            dashboard_addr: env_or("AQI_DASHBOARD_ADDR", defaults.dashboard_addr)?,
        })
    }

    /// Returns the API key or a descriptive error if it is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENWEATHER_API_KEY` is not set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.openweather_api_key
            .as_deref()
            .context("OPENWEATHER_API_KEY environment variable not set")
    }
}

/// Reads and parses an environment variable, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {name} ({value:?}): {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_location_parse() {
        assert_eq!(StoreLocation::parse("memory://"), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::parse("file:///var/lib/aqi"),
            StoreLocation::Local(PathBuf::from("/var/lib/aqi"))
        );
        assert_eq!(
            StoreLocation::parse("relative/dir"),
            StoreLocation::Local(PathBuf::from("relative/dir"))
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window_days, 30);
        assert!((config.train_ratio - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.min_rows_per_split, 2);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u32 = env_or("AQI_TEST_VARIABLE_THAT_IS_NEVER_SET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_memory_store_opens() {
        assert!(StoreLocation::Memory.open().is_ok());
    }
}
