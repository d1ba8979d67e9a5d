//! Turns API entries into ordered [`RawReading`] sequences.

use aqi_structs::{GeoLocation, RawReading};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::FetchError;
use crate::api::models::{PollutionEntry, WeatherEntry};
use crate::api::source::WeatherSource;

/// Maximum distance between a pollution entry and the weather entry joined to it.
pub const MAX_WEATHER_GAP_SECONDS: i64 = 3 * 3600;

/// The history endpoint serves at most one week per request.
pub const HISTORY_CHUNK_SECONDS: i64 = 7 * 86_400;

/// The pollution forecast covers four days of hourly steps.
pub const MAX_FORECAST_HOURS: usize = 96;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fetches the trailing `days` of hourly readings ending at `now`.
///
/// Readings are ordered by timestamp and lie within `[now - days, now]`.
///
/// # Errors
///
/// Returns a [`FetchError`] if the window is empty or invalid, or if the
/// upstream API fails or returns no pollution data.
pub async fn fetch_window(
    source: &dyn WeatherSource,
    location: GeoLocation,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<RawReading>, FetchError> {
    if days == 0 {
        return Err(FetchError::InvalidRequest(
            "window must span at least one day".into(),
        ));
    }
    if !location.is_valid() {
        return Err(FetchError::InvalidRequest(format!(
            "invalid location {location}"
        )));
    }

    let end = now.timestamp();
    let start = end - i64::from(days) * SECONDS_PER_DAY;

    info!(%location, days, start, end, "Fetching trailing window");

    let pollution = source.pollution_history(location, start, end).await?;
    if pollution.is_empty() {
        return Err(FetchError::Empty {
            endpoint: "air_pollution/history".into(),
        });
    }

    let mut weather = Vec::new();
    let mut chunk_start = start;
    while chunk_start < end {
        let chunk_end = (chunk_start + HISTORY_CHUNK_SECONDS).min(end);
        weather.extend(source.weather_history(location, chunk_start, chunk_end).await?);
        chunk_start = chunk_end;
    }

    let readings: Vec<RawReading> =
        join_readings(location, pollution, &weather, MAX_WEATHER_GAP_SECONDS)
            .into_iter()
            .filter(|r| (start..=end).contains(&r.timestamp))
            .collect();

    let without_weather = readings.iter().filter(|r| r.temp.is_none()).count();
    if without_weather > 0 {
        warn!(without_weather, "Some readings have no matching weather entry");
    }

    info!(readings = readings.len(), "Fetched readings");
    Ok(readings)
}

/// Fetches the current conditions as a single reading.
///
/// # Errors
///
/// Returns a [`FetchError`] if the upstream API fails or returns no data.
pub async fn fetch_current(
    source: &dyn WeatherSource,
    location: GeoLocation,
) -> Result<RawReading, FetchError> {
    let pollution = source.current_pollution(location).await?;
    let weather = source.current_weather(location).await?;

    // The current endpoints are joined directly, whatever their timestamps.
    let gap = pollution
        .first()
        .map_or(0, |p| (p.dt - weather.dt).abs());

    join_readings(location, pollution, &[weather], gap.max(MAX_WEATHER_GAP_SECONDS))
        .into_iter()
        .last()
        .ok_or_else(|| FetchError::Empty {
            endpoint: "air_pollution".into(),
        })
}

/// Fetches the first `hours` hourly forecast readings.
///
/// # Errors
///
/// Returns a [`FetchError`] if `hours` is outside `1..=96` or the upstream
/// API fails or returns no data.
pub async fn fetch_forecast(
    source: &dyn WeatherSource,
    location: GeoLocation,
    hours: usize,
) -> Result<Vec<RawReading>, FetchError> {
    if !(1..=MAX_FORECAST_HOURS).contains(&hours) {
        return Err(FetchError::InvalidRequest(format!(
            "forecast hours must be between 1 and {MAX_FORECAST_HOURS}, got {hours}"
        )));
    }

    let pollution = source.pollution_forecast(location).await?;
    if pollution.is_empty() {
        return Err(FetchError::Empty {
            endpoint: "air_pollution/forecast".into(),
        });
    }
    let weather = source.weather_forecast(location).await?;

    let mut readings = join_readings(location, pollution, &weather, MAX_WEATHER_GAP_SECONDS);
    readings.truncate(hours);
    Ok(readings)
}

/// Joins pollution entries with the nearest weather entry.
///
/// Output is sorted by timestamp with duplicate pollution timestamps
/// collapsed (first occurrence wins). A weather entry is used only if it is
/// at most `max_gap` seconds away; equally distant candidates resolve to the
/// earlier one.
#[must_use]
pub fn join_readings(
    location: GeoLocation,
    mut pollution: Vec<PollutionEntry>,
    weather: &[WeatherEntry],
    max_gap: i64,
) -> Vec<RawReading> {
    pollution.sort_by_key(|p| p.dt);
    pollution.dedup_by_key(|p| p.dt);

    let mut weather: Vec<&WeatherEntry> = weather.iter().collect();
    weather.sort_by_key(|w| w.dt);

    pollution
        .into_iter()
        .map(|entry| {
            let matched = nearest_weather(&weather, entry.dt)
                .filter(|w| (w.dt - entry.dt).abs() <= max_gap);
            to_reading(location, &entry, matched)
        })
        .collect()
}

/// Finds the weather entry closest to `dt` in a slice sorted by timestamp.
fn nearest_weather<'a>(sorted: &[&'a WeatherEntry], dt: i64) -> Option<&'a WeatherEntry> {
    let idx = sorted.partition_point(|w| w.dt < dt);
    let before = idx.checked_sub(1).and_then(|i| sorted.get(i)).copied();
    let after = sorted.get(idx).copied();

    match (before, after) {
        (Some(b), Some(a)) => {
            if dt - b.dt <= a.dt - dt {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

fn to_reading(
    location: GeoLocation,
    pollution: &PollutionEntry,
    weather: Option<&WeatherEntry>,
) -> RawReading {
    let components = pollution.components;
    RawReading {
        timestamp: pollution.dt,
        latitude: location.latitude,
        longitude: location.longitude,
        owm_aqi: pollution.main.and_then(|m| m.aqi),
        co: components.co,
        no2: components.no2,
        o3: components.o3,
        so2: components.so2,
        pm2_5: components.pm2_5,
        pm10: components.pm10,
        temp: weather.and_then(|w| w.main.temp),
        feels_like: weather.and_then(|w| w.main.feels_like),
        pressure: weather.and_then(|w| w.main.pressure),
        humidity: weather.and_then(|w| w.main.humidity),
        wind_speed: weather.and_then(|w| w.wind.speed),
        clouds: weather.and_then(|w| w.clouds.all),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::models::{Clouds, Components, PollutionMain, WeatherMain, Wind};

    fn pollution(dt: i64, pm2_5: f64) -> PollutionEntry {
        PollutionEntry {
            dt,
            main: Some(PollutionMain { aqi: Some(2) }),
            components: Components {
                co: Some(200.0),
                no2: Some(5.0),
                o3: Some(40.0),
                so2: Some(1.0),
                pm2_5: Some(pm2_5),
                pm10: Some(20.0),
                ..Components::default()
            },
        }
    }

    fn weather(dt: i64, temp: f64) -> WeatherEntry {
        WeatherEntry {
            dt,
            main: WeatherMain {
                temp: Some(temp),
                feels_like: Some(temp),
                pressure: Some(1010.0),
                humidity: Some(50.0),
            },
            wind: Wind { speed: Some(2.0) },
            clouds: Clouds { all: Some(0.0) },
        }
    }

    /// Canned source recording the history ranges it was asked for.
    #[derive(Default)]
    struct StubSource {
        pollution: Vec<PollutionEntry>,
        weather: Vec<WeatherEntry>,
        weather_calls: Mutex<Vec<(i64, i64)>>,
    }

    #[async_trait]
    impl WeatherSource for StubSource {
        async fn pollution_history(
            &self,
            _location: GeoLocation,
            _start: i64,
            _end: i64,
        ) -> Result<Vec<PollutionEntry>, FetchError> {
            Ok(self.pollution.clone())
        }

        async fn weather_history(
            &self,
            _location: GeoLocation,
            start: i64,
            end: i64,
        ) -> Result<Vec<WeatherEntry>, FetchError> {
            self.weather_calls.lock().unwrap().push((start, end));
            Ok(self
                .weather
                .iter()
                .filter(|w| w.dt >= start && w.dt < end)
                .cloned()
                .collect())
        }

        async fn current_pollution(
            &self,
            _location: GeoLocation,
        ) -> Result<Vec<PollutionEntry>, FetchError> {
            Ok(self.pollution.clone())
        }

        async fn current_weather(
            &self,
            _location: GeoLocation,
        ) -> Result<WeatherEntry, FetchError> {
            self.weather.first().cloned().ok_or(FetchError::Empty {
                endpoint: "weather".into(),
            })
        }

        async fn pollution_forecast(
            &self,
            _location: GeoLocation,
        ) -> Result<Vec<PollutionEntry>, FetchError> {
            Ok(self.pollution.clone())
        }

        async fn weather_forecast(
            &self,
            _location: GeoLocation,
        ) -> Result<Vec<WeatherEntry>, FetchError> {
            Ok(self.weather.clone())
        }
    }

    #[test]
    fn test_join_sorts_and_dedups() {
        let entries = vec![pollution(7200, 3.0), pollution(0, 1.0), pollution(7200, 9.0)];
        let readings = join_readings(GeoLocation::KARACHI, entries, &[], MAX_WEATHER_GAP_SECONDS);

        let timestamps: Vec<i64> = readings.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, [0, 7200]);
        assert_eq!(readings[1].pm2_5, Some(3.0));
    }

    #[test]
    fn test_join_picks_nearest_weather_with_earlier_tie() {
        let weather = [weather(0, 10.0), weather(3600, 20.0), weather(10_800, 30.0)];

        let readings = join_readings(
            GeoLocation::KARACHI,
            vec![pollution(1800, 5.0), pollution(9000, 5.0)],
            &weather,
            MAX_WEATHER_GAP_SECONDS,
        );

        assert_eq!(readings[0].temp, Some(10.0));
        assert_eq!(readings[1].temp, Some(30.0));
    }

    #[test]
    fn test_join_respects_max_gap() {
        let readings = join_readings(
            GeoLocation::KARACHI,
            vec![pollution(100_000, 5.0)],
            &[weather(0, 10.0)],
            MAX_WEATHER_GAP_SECONDS,
        );
        assert_eq!(readings.len(), 1);
        assert!(readings[0].temp.is_none());
        assert_eq!(readings[0].pm2_5, Some(5.0));
    }

    #[tokio::test]
    async fn test_fetch_window_is_ordered_and_bounded() {
        let now = DateTime::from_timestamp(30 * SECONDS_PER_DAY, 0).unwrap();
        let source = StubSource {
            pollution: vec![
                pollution(29 * SECONDS_PER_DAY, 2.0),
                pollution(-10, 1.0),
                pollution(SECONDS_PER_DAY, 3.0),
            ],
            weather: vec![weather(SECONDS_PER_DAY, 21.0), weather(29 * SECONDS_PER_DAY, 25.0)],
            ..StubSource::default()
        };

        let readings = fetch_window(&source, GeoLocation::KARACHI, 30, now)
            .await
            .unwrap();

        let timestamps: Vec<i64> = readings.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, [SECONDS_PER_DAY, 29 * SECONDS_PER_DAY]);
        assert_eq!(readings[0].temp, Some(21.0));
        assert_eq!(readings[1].temp, Some(25.0));

        // 30 days are requested as five weekly chunks.
        let calls = source.weather_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0].0, 0);
        assert_eq!(calls[4].1, 30 * SECONDS_PER_DAY);
    }

    #[tokio::test]
    async fn test_fetch_window_empty_pollution_is_error() {
        let source = StubSource::default();
        let err = fetch_window(&source, GeoLocation::KARACHI, 30, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_fetch_window_rejects_zero_days() {
        let source = StubSource::default();
        let err = fetch_window(&source, GeoLocation::KARACHI, 0, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_fetch_current_joins_single_point() {
        let source = StubSource {
            pollution: vec![pollution(50_000, 8.0)],
            weather: vec![weather(0, 18.0)],
            ..StubSource::default()
        };

        let reading = fetch_current(&source, GeoLocation::KARACHI).await.unwrap();
        assert_eq!(reading.timestamp, 50_000);
        assert_eq!(reading.pm2_5, Some(8.0));
        assert_eq!(reading.temp, Some(18.0));
    }

    #[tokio::test]
    async fn test_fetch_forecast_truncates_and_validates_hours() {
        let source = StubSource {
            pollution: (0..10).map(|h| pollution(h * 3600, 5.0)).collect(),
            weather: vec![weather(0, 20.0), weather(10_800, 22.0)],
            ..StubSource::default()
        };

        let readings = fetch_forecast(&source, GeoLocation::KARACHI, 4)
            .await
            .unwrap();
        assert_eq!(readings.len(), 4);

        let err = fetch_forecast(&source, GeoLocation::KARACHI, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }
}
