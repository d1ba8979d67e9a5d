use std::path::PathBuf;

use thiserror::Error;

/// Errors from the feature store, model registry and local cache.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store unavailable: {0}")]
    Store(#[from] object_store::Error),

    #[error("feature group {group} has no published version")]
    GroupNotFound { group: String },

    #[error("{name} has no version {version}")]
    VersionNotFound { name: String, version: u32 },

    #[error("no model registered under {name}")]
    NoModel { name: String },

    #[error("corrupt object {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("nothing to register")]
    EmptyRegistration,
}
