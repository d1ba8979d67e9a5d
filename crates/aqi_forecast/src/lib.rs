//! AQI forecast pipeline.
//!
//! Fetches hourly pollution and weather readings, turns them into versioned
//! feature rows, trains and registers regression models, and serves AQI
//! predictions on the command line and through a web dashboard.

use std::sync::Arc;

use anyhow::Result;
use config::Config;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use store::{FeatureStore, ModelRegistry};

pub mod commands;
pub mod dashboard;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

/// Feature store and model registry sharing one object store.
#[derive(Clone)]
pub struct Stores {
    pub features: FeatureStore,
    pub registry: ModelRegistry,
}

impl Stores {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            features: FeatureStore::new(Arc::clone(&store)),
            registry: ModelRegistry::new(store),
        }
    }

    /// Opens the store configured by `STORE_URL` / `STORE_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store location cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(config.store.open()?))
    }

    /// Ephemeral stores, lost when dropped.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }
}
