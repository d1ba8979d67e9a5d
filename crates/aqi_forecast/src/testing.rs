//! Canned weather data and pre-trained stores for tests.

use aqi_structs::{FeatureRef, GeoLocation, ML_FEATURE_GROUP};
use async_trait::async_trait;
use feature_builder::{ValidationMode, build_features};
use ml_model::{BoostingParams, ForestParams, RidgeParams, TrainerConfig, train_and_select};
use openweather_client::api::models::{
    Clouds, Components, PollutionEntry, PollutionMain, WeatherEntry, WeatherMain, Wind,
};
use openweather_client::{FetchError, MAX_WEATHER_GAP_SECONDS, WeatherSource, join_readings};

use crate::Stores;

/// 2023-11-14T22:13:20Z
pub const FIXTURE_START: i64 = 1_700_000_000;

/// Serves the same hourly series for history, current and forecast requests.
pub struct FixtureSource {
    pollution: Vec<PollutionEntry>,
    weather: Vec<WeatherEntry>,
    fail: bool,
}

impl FixtureSource {
    pub fn hourly(hours: usize) -> Self {
        let pollution = (0..hours)
            .map(|i| {
                let x = i as f64;
                PollutionEntry {
                    dt: FIXTURE_START + i as i64 * 3600,
                    main: Some(PollutionMain { aqi: Some(2) }),
                    components: Components {
                        co: Some(x.mul_add(6.0, 280.0)),
                        no: Some(0.5),
                        no2: Some(12.0 + (x * 0.5).sin() * 4.0),
                        o3: Some(45.0 + (x * 0.3).cos() * 10.0),
                        so2: Some(5.0),
                        pm2_5: Some(x.mul_add(1.5, 12.0) + (x * 0.9).sin()),
                        pm10: Some(x.mul_add(2.0, 30.0)),
                        nh3: Some(1.0),
                    },
                }
            })
            .collect();

        let weather = (0..hours)
            .map(|i| {
                let x = i as f64;
                WeatherEntry {
                    dt: FIXTURE_START + i as i64 * 3600,
                    main: WeatherMain {
                        temp: Some(26.0 + (x * 0.26).sin() * 3.0),
                        feels_like: Some(28.0),
                        pressure: Some(1009.0),
                        humidity: Some(60.0 + (x % 7.0) * 2.0),
                    },
                    wind: Wind {
                        speed: Some(2.0 + x % 3.0),
                    },
                    clouds: Clouds { all: Some(20.0) },
                }
            })
            .collect();

        Self {
            pollution,
            weather,
            fail: false,
        }
    }

    /// A source whose every request fails with HTTP 503.
    pub fn failing() -> Self {
        Self {
            pollution: Vec::new(),
            weather: Vec::new(),
            fail: true,
        }
    }

    pub fn corrupt_humidity(&mut self, humidity: f64) {
        for entry in &mut self.weather {
            entry.main.humidity = Some(humidity);
        }
    }

    /// Timestamp of the newest entry.
    pub fn last_timestamp(&self) -> i64 {
        self.pollution.last().map_or(FIXTURE_START, |p| p.dt)
    }

    fn check(&self, endpoint: &str) -> Result<(), FetchError> {
        if self.fail {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherSource for FixtureSource {
    async fn pollution_history(
        &self,
        _location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        self.check("air_pollution/history")?;
        Ok(self
            .pollution
            .iter()
            .filter(|p| (start..=end).contains(&p.dt))
            .cloned()
            .collect())
    }

    async fn weather_history(
        &self,
        _location: GeoLocation,
        start: i64,
        end: i64,
    ) -> Result<Vec<WeatherEntry>, FetchError> {
        self.check("history/city")?;
        Ok(self
            .weather
            .iter()
            .filter(|w| (start..=end).contains(&w.dt))
            .cloned()
            .collect())
    }

    async fn current_pollution(
        &self,
        _location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        self.check("air_pollution")?;
        Ok(self.pollution.last().cloned().into_iter().collect())
    }

    async fn current_weather(&self, _location: GeoLocation) -> Result<WeatherEntry, FetchError> {
        self.check("weather")?;
        self.weather.last().cloned().ok_or(FetchError::Empty {
            endpoint: "weather".into(),
        })
    }

    async fn pollution_forecast(
        &self,
        _location: GeoLocation,
    ) -> Result<Vec<PollutionEntry>, FetchError> {
        self.check("air_pollution/forecast")?;
        Ok(self.pollution.clone())
    }

    async fn weather_forecast(
        &self,
        _location: GeoLocation,
    ) -> Result<Vec<WeatherEntry>, FetchError> {
        self.check("forecast")?;
        Ok(self.weather.clone())
    }
}

/// A trainer configuration small enough for unit tests.
pub fn fast_trainer() -> TrainerConfig {
    TrainerConfig {
        forest: ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        },
        boosting: BoostingParams {
            n_stages: 10,
            ..BoostingParams::default()
        },
        ridge: RidgeParams {
            epochs: 100,
            ..RidgeParams::default()
        },
        ..TrainerConfig::default()
    }
}

/// In-memory stores with every family and the served model registered once.
pub async fn registered_stores() -> Stores {
    let source = FixtureSource::hourly(24);
    let readings = join_readings(
        GeoLocation::KARACHI,
        source.pollution.clone(),
        &source.weather,
        MAX_WEATHER_GAP_SECONDS,
    );
    let rows = build_features(&readings, ValidationMode::Reject)
        .expect("fixture readings are valid")
        .rows;

    let report = train_and_select(rows, FeatureRef::new(ML_FEATURE_GROUP, 1), &fast_trainer())
        .expect("fixture rows train");

    let stores = Stores::in_memory();
    stores
        .registry
        .register_all(report.registrations())
        .await
        .expect("registration succeeds");
    stores
}

