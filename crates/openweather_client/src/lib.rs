//! OpenWeatherMap weather and air pollution client.
//!
//! Fetches hourly pollutant and weather observations for a location and
//! joins them into [`RawReading`](aqi_structs::RawReading)s.

pub mod api;
mod error;
mod fetcher;

pub use api::client::OpenWeatherClient;
pub use api::source::WeatherSource;
pub use error::FetchError;
pub use fetcher::{
    HISTORY_CHUNK_SECONDS, MAX_FORECAST_HOURS, MAX_WEATHER_GAP_SECONDS, fetch_current,
    fetch_forecast, fetch_window, join_readings,
};
