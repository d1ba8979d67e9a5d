//! Rate-limited HTTP client for the openweathermap.org API.

use core::num::NonZeroU32;
use core::time::Duration;

use aqi_structs::GeoLocation;
use async_trait::async_trait;
use config::Config;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::models::{PollutionEntry, PollutionResponse, WeatherEntry, WeatherListResponse};
use super::source::WeatherSource;
use crate::FetchError;

/// Rate limit: 60 requests per minute (free tier)
const RATE_LIMIT_PER_MINUTE: NonZeroU32 = NonZeroU32::new(60).unwrap();

/// Request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";
const AIR_POLLUTION_FORECAST_PATH: &str = "/data/2.5/air_pollution/forecast";
const AIR_POLLUTION_HISTORY_PATH: &str = "/data/2.5/air_pollution/history";
const WEATHER_PATH: &str = "/data/2.5/weather";
const WEATHER_FORECAST_PATH: &str = "/data/2.5/forecast";
const WEATHER_HISTORY_PATH: &str = "/data/2.5/history/city";

type RateLimiterType = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate-limited client for the OpenWeatherMap API.
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    history_url: String,
    limiter: RateLimiterType,
}

impl OpenWeatherClient {
    /// Creates a new client with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        history_url: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;

        let limiter = RateLimiter::direct(Quota::per_minute(RATE_LIMIT_PER_MINUTE));

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            history_url: history_url.into().trim_end_matches('/').to_string(),
            limiter,
        })
    }

    /// Creates a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client cannot
    /// be created.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let api_key = config
            .openweather_api_key
            .clone()
            .ok_or_else(|| FetchError::InvalidRequest("OPENWEATHER_API_KEY not set".into()))?;

        Self::new(
            api_key,
            &config.openweather_base_url,
            &config.openweather_history_url,
        )
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// The API key is appended here and never logged.
    async fn get_json<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.limiter.until_ready().await;

        let endpoint = path.to_string();
        debug!(endpoint, ?query, "Requesting");

        let response = self
            .client
            .get(format!("{base}{path}"))
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            endpoint,
            reason: e.to_string(),
        })
    }

    async fn get_pollution(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        let response: PollutionResponse = self.get_json(&self.base_url, path, query).await?;
        info!(endpoint = path, entries = response.list.len(), "Received pollution data");
        Ok(response.list)
    }
}

fn location_query(location: GeoLocation) -> Vec<(&'static str, String)> {
    vec![
        ("lat", location.latitude.to_string()),
        ("lon", location.longitude.to_string()),
    ]
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn pollution_history(
        &self,
        location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        let mut query = location_query(location);
        query.push(("start", start.to_string()));
        query.push(("end", end.to_string()));
        self.get_pollution(AIR_POLLUTION_HISTORY_PATH, &query).await
    }

    async fn weather_history(
        &self,
        location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<WeatherEntry>, FetchError> {
        let mut query = location_query(location);
        query.push(("type", "hour".to_string()));
        query.push(("start", start.to_string()));
        query.push(("end", end.to_string()));
        query.push(("units", "metric".to_string()));

        let response: WeatherListResponse = self
            .get_json(&self.history_url, WEATHER_HISTORY_PATH, &query)
            .await?;
        info!(entries = response.list.len(), "Received weather history");
        Ok(response.list)
    }

    async fn current_pollution(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        self.get_pollution(AIR_POLLUTION_PATH, &location_query(location))
            .await
    }

    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherEntry, FetchError> {
        let mut query = location_query(location);
        query.push(("units", "metric".to_string()));
        self.get_json(&self.base_url, WEATHER_PATH, &query).await
    }

    async fn pollution_forecast(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        self.get_pollution(AIR_POLLUTION_FORECAST_PATH, &location_query(location))
            .await
    }

    async fn weather_forecast(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<WeatherEntry>, FetchError> {
        let mut query = location_query(location);
        query.push(("units", "metric".to_string()));

        let response: WeatherListResponse = self
            .get_json(&self.base_url, WEATHER_FORECAST_PATH, &query)
            .await?;
        info!(entries = response.list.len(), "Received weather forecast");
        Ok(response.list)
    }
}
