//! Abstraction over the weather/pollution data provider.

use aqi_structs::GeoLocation;
use async_trait::async_trait;

use super::models::{PollutionEntry, WeatherEntry};
use crate::FetchError;

/// A provider of hourly pollution and weather data.
///
/// Implemented by [`OpenWeatherClient`](super::client::OpenWeatherClient);
/// tests substitute canned data.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Hourly pollution observations in `[start, end]` (unix seconds).
    async fn pollution_history(
        &self,
        location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<PollutionEntry>, FetchError>;

    /// Hourly weather observations in `[start, end]` (unix seconds).
    async fn weather_history(
        &self,
        location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<WeatherEntry>, FetchError>;

    /// The latest pollution observation.
    async fn current_pollution(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError>;

    /// The latest weather observation.
    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherEntry, FetchError>;

    /// Hourly pollution forecast.
    async fn pollution_forecast(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError>;

    /// Three-hourly weather forecast.
    async fn weather_forecast(&self, location: GeoLocation)
    -> Result<Vec<WeatherEntry>, FetchError>;
}
