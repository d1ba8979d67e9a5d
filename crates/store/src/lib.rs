//! Versioned persistence for feature groups and trained models.
//!
//! Everything lives in an [`object_store::ObjectStore`]. Each feature group
//! and model name gets numbered version directories plus a `latest.json`
//! pointer. The pointer is written only after every object of a version is
//! in place, so readers never observe a partially written version.

pub mod cache;
mod error;
mod feature_store;
mod objects;
mod registry;

pub use error::RegistryError;
pub use feature_store::{FeatureGroupManifest, FeatureStore};
pub use registry::{ModelArtifact, ModelRegistry};
