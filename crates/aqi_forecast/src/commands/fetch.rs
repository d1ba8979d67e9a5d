//! Fetch command - pulls the trailing window of readings into the raw feature group.

use anyhow::{Context, Result};
use aqi_structs::RAW_FEATURE_GROUP;
use chrono::{DateTime, Utc};
use config::Config;
use openweather_client::{WeatherSource, fetch_window};
use store::FeatureGroupManifest;
use tracing::info;

use crate::Stores;

/// Runs the fetch command.
///
/// # Errors
///
/// Returns an error if the API request fails or the readings cannot be stored.
pub async fn run(
    config: &Config,
    stores: &Stores,
    source: &dyn WeatherSource,
    now: DateTime<Utc>,
) -> Result<FeatureGroupManifest> {
    info!(
        location = %config.location,
        days = config.window_days,
        "Fetching raw readings"
    );

    let readings = fetch_window(source, config.location, config.window_days, now)
        .await
        .context("Failed to fetch readings")?;

    let description = format!(
        "Hourly air pollution and weather readings at {} over {} days",
        config.location, config.window_days
    );

    let manifest = stores
        .features
        .insert(RAW_FEATURE_GROUP, &description, &readings, None)
        .await
        .context("Failed to store raw readings")?;

    info!(
        group = RAW_FEATURE_GROUP,
        version = manifest.version,
        rows = manifest.row_count,
        "Fetch complete"
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use aqi_structs::RawReading;

    use super::*;
    use crate::testing::FixtureSource;

    #[tokio::test]
    async fn test_fetch_stores_a_new_raw_version() {
        let stores = Stores::in_memory();
        let source = FixtureSource::hourly(30);
        let now = DateTime::from_timestamp(source.last_timestamp(), 0).unwrap();

        let first = run(&Config::default(), &stores, &source, now).await.unwrap();
        let second = run(&Config::default(), &stores, &source, now).await.unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(first.row_count, 30);

        let (_, readings) = stores
            .features
            .read_latest::<RawReading>(RAW_FEATURE_GROUP)
            .await
            .unwrap();
        assert_eq!(readings.len(), 30);
        assert!(readings.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_upstream_failure_stores_nothing() {
        let stores = Stores::in_memory();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let result = run(&Config::default(), &stores, &FixtureSource::failing(), now).await;

        assert!(result.is_err());
        assert_eq!(
            stores.features.latest_version(RAW_FEATURE_GROUP).await.unwrap(),
            None
        );
    }
}
