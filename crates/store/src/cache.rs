//! Local CSV cache of feature group versions.
//!
//! Each published version is mirrored to `<dir>/<group>_v<version>.csv`
//! for offline inspection.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::RegistryError;

/// Path of the cached CSV for a group version.
#[must_use]
pub fn cache_path(dir: &Path, group: &str, version: u32) -> PathBuf {
    dir.join(format!("{group}_v{version}.csv"))
}

/// Writes `rows` to the cache, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_rows<T: Serialize>(
    dir: &Path,
    group: &str,
    version: u32,
    rows: &[T],
) -> Result<PathBuf, RegistryError> {
    std::fs::create_dir_all(dir).map_err(|source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = cache_path(dir, group, version);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| RegistryError::Io {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote feature cache");
    Ok(path)
}

/// Reads rows back from a cached CSV file.
///
/// # Errors
///
/// Returns an error if the file is missing or does not match `T`.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RegistryError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use aqi_structs::{ML_FEATURE_GROUP, RawReading};

    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            RawReading {
                timestamp: 1_700_000_000,
                pm2_5: Some(12.5),
                ..RawReading::default()
            },
            RawReading {
                timestamp: 1_700_003_600,
                pm10: Some(40.25),
                ..RawReading::default()
            },
        ];

        let path = write_rows(dir.path(), ML_FEATURE_GROUP, 3, &rows).unwrap();

        assert_eq!(path, dir.path().join("aqi_ml_training_features_v3.csv"));
        let read: Vec<RawReading> = read_rows(&path).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cache").join("features");

        let path = write_rows::<RawReading>(&nested, "group", 1, &[]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_rows::<RawReading>(&dir.path().join("absent.csv"));
        assert!(result.is_err());
    }
}
