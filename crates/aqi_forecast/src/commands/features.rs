//! Features command - turns the latest raw readings into ML feature rows.

use anyhow::{Context, Result};
use aqi_structs::{ML_FEATURE_GROUP, RAW_FEATURE_GROUP, RawReading};
use config::Config;
use feature_builder::{ValidationMode, build_features};
use store::FeatureGroupManifest;
use tracing::{info, warn};

use crate::Stores;

/// Runs the features command.
///
/// Invalid readings are dropped and logged; the surviving rows are mirrored
/// to the local cache and then published as a new version of the ML feature
/// group.
///
/// # Errors
///
/// Returns an error if no raw readings are stored, every reading is invalid,
/// or the rows cannot be written.
pub async fn run(config: &Config, stores: &Stores) -> Result<FeatureGroupManifest> {
    let (raw, readings) = stores
        .features
        .read_latest::<RawReading>(RAW_FEATURE_GROUP)
        .await
        .context("Failed to read raw readings")?;

    info!(
        group = RAW_FEATURE_GROUP,
        version = raw.version,
        readings = readings.len(),
        "Building features"
    );

    let output =
        build_features(&readings, ValidationMode::Drop).context("Failed to build features")?;

    if !output.dropped.is_empty() {
        warn!(
            dropped = output.dropped.len(),
            kept = output.rows.len(),
            "Some readings were invalid"
        );
    }

    let description = format!(
        "Engineered features and EPA AQI target derived from {}",
        raw.feature_ref()
    );

    // The cache is written first so a failed stage publishes nothing.
    let version = stores
        .features
        .next_version(ML_FEATURE_GROUP)
        .await
        .context("Failed to read feature group version")?;
    let cache_path =
        store::cache::write_rows(&config.feature_cache_dir, ML_FEATURE_GROUP, version, &output.rows)
            .context("Failed to write feature cache")?;

    let manifest = stores
        .features
        .insert(
            ML_FEATURE_GROUP,
            &description,
            &output.rows,
            Some(raw.feature_ref()),
        )
        .await
        .context("Failed to store feature rows")?;

    info!(
        group = ML_FEATURE_GROUP,
        version = manifest.version,
        rows = manifest.row_count,
        cache = %cache_path.display(),
        "Features complete"
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use aqi_structs::{FeatureRef, FeatureRow};
    use chrono::DateTime;

    use super::*;
    use crate::commands::fetch;
    use crate::testing::FixtureSource;

    fn config(cache: &std::path::Path) -> Config {
        Config {
            feature_cache_dir: cache.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_features_record_lineage_and_cache() {
        let cache = tempfile::tempdir().unwrap();
        let config = config(cache.path());
        let stores = Stores::in_memory();
        let source = FixtureSource::hourly(10);
        let now = DateTime::from_timestamp(source.last_timestamp(), 0).unwrap();
        fetch::run(&config, &stores, &source, now).await.unwrap();

        let manifest = run(&config, &stores).await.unwrap();

        assert_eq!(manifest.row_count, 10);
        assert_eq!(manifest.source, Some(FeatureRef::new(RAW_FEATURE_GROUP, 1)));

        let stored: Vec<FeatureRow> = stores
            .features
            .read(ML_FEATURE_GROUP, manifest.version)
            .await
            .unwrap();
        assert!(stored.iter().all(FeatureRow::is_complete));

        let cached: Vec<FeatureRow> = store::cache::read_rows(&store::cache::cache_path(
            cache.path(),
            ML_FEATURE_GROUP,
            manifest.version,
        ))
        .unwrap();
        assert_eq!(cached, stored);
    }

    #[tokio::test]
    async fn test_features_without_raw_data_fail() {
        let cache = tempfile::tempdir().unwrap();
        let result = run(&config(cache.path()), &Stores::in_memory()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cache_failure_publishes_no_version() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocked = dir.path().join("cache");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let config = config(&blocked);
        let stores = Stores::in_memory();
        let source = FixtureSource::hourly(10);
        let now = DateTime::from_timestamp(source.last_timestamp(), 0).unwrap();
        fetch::run(&config, &stores, &source, now).await.unwrap();

        let err = run(&config, &stores).await.unwrap_err();

        assert!(err.to_string().contains("feature cache"));
        assert_eq!(
            stores.features.latest_version(ML_FEATURE_GROUP).await.unwrap(),
            None
        );
    }
}
