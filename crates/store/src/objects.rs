//! Object layout and JSON helpers shared by the feature store and registry.

use bytes::Bytes;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::RegistryError;

pub const FEATURE_GROUPS_ROOT: &str = "feature_groups";
pub const MODELS_ROOT: &str = "models";
pub const LATEST_FILE: &str = "latest.json";

/// Pointer to the most recent published version of a group or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    pub version: u32,
}

pub fn latest_path(root: &str, name: &str) -> ObjectStorePath {
    ObjectStorePath::from(format!("{root}/{name}/{LATEST_FILE}"))
}

pub fn version_path(root: &str, name: &str, version: u32, file: &str) -> ObjectStorePath {
    ObjectStorePath::from(format!("{root}/{name}/v{version}/{file}"))
}

/// Reads an object, returning `None` if it does not exist.
pub async fn get_bytes(
    store: &dyn ObjectStore,
    path: &ObjectStorePath,
) -> Result<Option<Bytes>, RegistryError> {
    match store.get(path).await {
        Ok(result) => Ok(Some(result.bytes().await?)),
        Err(object_store::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    path: &ObjectStorePath,
) -> Result<Option<T>, RegistryError> {
    let Some(bytes) = get_bytes(store, path).await? else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| RegistryError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

pub async fn put_bytes(
    store: &dyn ObjectStore,
    path: &ObjectStorePath,
    bytes: Vec<u8>,
) -> Result<(), RegistryError> {
    store.put(path, PutPayload::from(bytes)).await?;
    Ok(())
}

pub async fn put_json<T: Serialize>(
    store: &dyn ObjectStore,
    path: &ObjectStorePath,
    value: &T,
) -> Result<(), RegistryError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| RegistryError::Corrupt {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    put_bytes(store, path, bytes).await
}

pub async fn latest_version(
    store: &dyn ObjectStore,
    root: &str,
    name: &str,
) -> Result<Option<u32>, RegistryError> {
    let pointer: Option<LatestPointer> = get_json(store, &latest_path(root, name)).await?;
    Ok(pointer.map(|p| p.version))
}

pub async fn publish(
    store: &dyn ObjectStore,
    root: &str,
    name: &str,
    version: u32,
) -> Result<(), RegistryError> {
    put_json(store, &latest_path(root, name), &LatestPointer { version }).await
}
