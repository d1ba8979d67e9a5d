//! Versioned feature groups stored as CSV with a JSON manifest.

use std::sync::Arc;

use aqi_structs::{FeatureRef, Timestamped};
use chrono::{DateTime, Utc};
use object_store::ObjectStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::RegistryError;
use crate::objects::{self, FEATURE_GROUPS_ROOT};

const ROWS_FILE: &str = "rows.csv";
const MANIFEST_FILE: &str = "manifest.json";

/// Metadata describing one published version of a feature group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroupManifest {
    pub name: String,
    pub version: u32,
    pub description: String,
    pub row_count: usize,
    /// Column names in CSV order.
    pub columns: Vec<String>,
    /// Earliest row timestamp, if the version has rows.
    pub window_start: Option<i64>,
    /// Latest row timestamp, if the version has rows.
    pub window_end: Option<i64>,
    /// The group version these rows were derived from.
    pub source: Option<FeatureRef>,
    pub created_at: DateTime<Utc>,
}

impl FeatureGroupManifest {
    /// Lineage reference to this version.
    #[must_use]
    pub fn feature_ref(&self) -> FeatureRef {
        FeatureRef::new(self.name.clone(), self.version)
    }
}

/// Append-only store of feature group versions.
#[derive(Clone)]
pub struct FeatureStore {
    store: Arc<dyn ObjectStore>,
}

impl FeatureStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Writes `rows` as a new version of `group` and publishes it.
    ///
    /// Rows and manifest are written before the `latest` pointer, so a
    /// failure part way leaves the previous version as the latest.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be serialized or the store rejects a write.
    pub async fn insert<T>(
        &self,
        group: &str,
        description: &str,
        rows: &[T],
        source: Option<FeatureRef>,
    ) -> Result<FeatureGroupManifest, RegistryError>
    where
        T: Serialize + Timestamped,
    {
        let version = self.next_version(group).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let csv_bytes = writer.into_inner().map_err(|e| RegistryError::Corrupt {
            path: group.to_string(),
            reason: e.to_string(),
        })?;
        let columns = header_columns(&csv_bytes)?;

        let manifest = FeatureGroupManifest {
            name: group.to_string(),
            version,
            description: description.to_string(),
            row_count: rows.len(),
            columns,
            window_start: rows.iter().map(Timestamped::timestamp).min(),
            window_end: rows.iter().map(Timestamped::timestamp).max(),
            source,
            created_at: Utc::now(),
        };

        let store = self.store.as_ref();
        let rows_path = objects::version_path(FEATURE_GROUPS_ROOT, group, version, ROWS_FILE);
        objects::put_bytes(store, &rows_path, csv_bytes).await?;
        debug!(path = %rows_path, rows = rows.len(), "Staged feature rows");

        let manifest_path =
            objects::version_path(FEATURE_GROUPS_ROOT, group, version, MANIFEST_FILE);
        objects::put_json(store, &manifest_path, &manifest).await?;

        objects::publish(store, FEATURE_GROUPS_ROOT, group, version).await?;

        info!(
            group,
            version,
            rows = manifest.row_count,
            "Published feature group version"
        );

        Ok(manifest)
    }

    /// Version the next [`insert`](Self::insert) into `group` will publish.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the pointer is corrupt.
    pub async fn next_version(&self, group: &str) -> Result<u32, RegistryError> {
        Ok(self.latest_version(group).await?.map_or(1, |v| v + 1))
    }

    /// Latest published version of `group`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the pointer is corrupt.
    pub async fn latest_version(&self, group: &str) -> Result<Option<u32>, RegistryError> {
        objects::latest_version(self.store.as_ref(), FEATURE_GROUPS_ROOT, group).await
    }

    /// Manifest of a specific version.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::VersionNotFound`] if the version does not exist.
    pub async fn manifest(
        &self,
        group: &str,
        version: u32,
    ) -> Result<FeatureGroupManifest, RegistryError> {
        let path = objects::version_path(FEATURE_GROUPS_ROOT, group, version, MANIFEST_FILE);
        objects::get_json(self.store.as_ref(), &path)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: group.to_string(),
                version,
            })
    }

    /// Rows of a specific version, in the order they were written.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::VersionNotFound`] if the version does not exist
    /// or a CSV error if the rows do not match `T`.
    pub async fn read<T>(&self, group: &str, version: u32) -> Result<Vec<T>, RegistryError>
    where
        T: DeserializeOwned,
    {
        let path = objects::version_path(FEATURE_GROUPS_ROOT, group, version, ROWS_FILE);
        let bytes = objects::get_bytes(self.store.as_ref(), &path)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: group.to_string(),
                version,
            })?;

        let mut reader = csv::Reader::from_reader(bytes.as_ref());
        let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }

    /// Manifest and rows of the latest published version.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::GroupNotFound`] if nothing has been published.
    pub async fn read_latest<T>(
        &self,
        group: &str,
    ) -> Result<(FeatureGroupManifest, Vec<T>), RegistryError>
    where
        T: DeserializeOwned,
    {
        let version =
            self.latest_version(group)
                .await?
                .ok_or_else(|| RegistryError::GroupNotFound {
                    group: group.to_string(),
                })?;

        let manifest = self.manifest(group, version).await?;
        let rows = self.read(group, version).await?;
        Ok((manifest, rows))
    }
}

fn header_columns(csv_bytes: &[u8]) -> Result<Vec<String>, RegistryError> {
    if csv_bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_reader(csv_bytes);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}
