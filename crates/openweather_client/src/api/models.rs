//! API response types for openweathermap.org.
//!
//! Every measured value is optional so that a partially populated response
//! reaches validation instead of failing deserialisation.

use serde::{Deserialize, Serialize};

/// Response from the `air_pollution` endpoints (current, forecast, history).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollutionResponse {
    /// Coordinates the response refers to
    pub coord: Option<Coord>,

    /// Hourly entries
    #[serde(default)]
    pub list: Vec<PollutionEntry>,
}

/// Coordinates echoed back by the API.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One hourly air pollution entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollutionEntry {
    /// Unix timestamp (UTC)
    pub dt: i64,

    /// OpenWeather air quality index
    pub main: Option<PollutionMain>,

    /// Pollutant concentrations in µg/m³
    #[serde(default)]
    pub components: Components,
}

/// OpenWeather's own 1-5 air quality index.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PollutionMain {
    pub aqi: Option<u8>,
}

/// Pollutant concentrations in µg/m³.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Components {
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

/// Response from the `forecast` and `history/city` endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherListResponse {
    #[serde(default)]
    pub list: Vec<WeatherEntry>,
}

/// One weather observation or forecast step.
///
/// Also the shape of the current `weather` endpoint response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherEntry {
    /// Unix timestamp (UTC)
    pub dt: i64,

    #[serde(default)]
    pub main: WeatherMain,

    #[serde(default)]
    pub wind: Wind,

    #[serde(default)]
    pub clouds: Clouds,
}

/// Temperature, pressure and humidity (metric units).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct WeatherMain {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Wind {
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Clouds {
    pub all: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pollution_response() {
        let json = r#"{
            "coord": {"lon": 67.0011, "lat": 24.8607},
            "list": [{
                "main": {"aqi": 3},
                "components": {"co": 201.94, "no": 0.02, "no2": 0.77, "o3": 68.66,
                               "so2": 0.64, "pm2_5": 18.5, "pm10": 40.2, "nh3": 0.12},
                "dt": 1700000000
            }]
        }"#;
        let response: PollutionResponse = serde_json::from_str(json).unwrap();
        let entry = &response.list[0];
        assert_eq!(entry.dt, 1_700_000_000);
        assert_eq!(entry.main.and_then(|m| m.aqi), Some(3));
        assert_eq!(entry.components.pm2_5, Some(18.5));
    }

    #[test]
    fn test_parse_weather_entry_with_missing_sections() {
        let json = r#"{"dt": 1700000000, "main": {"temp": 25.1, "humidity": 60}}"#;
        let entry: WeatherEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.main.temp, Some(25.1));
        assert_eq!(entry.main.humidity, Some(60.0));
        assert_eq!(entry.wind.speed, None);
        assert_eq!(entry.clouds.all, None);
    }
}
