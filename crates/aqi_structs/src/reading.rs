use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GeoLocation, Pollutant, Timestamped};

/// One hourly observation of weather and pollutant concentrations.
///
/// Concentrations are in µg/m³. Every measured attribute is optional so
/// that missing upstream fields survive until validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReading {
    /// Unix timestamp in seconds (UTC).
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// OpenWeather's own 1-5 air quality index.
    pub owm_aqi: Option<u8>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    /// Temperature in °C.
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    /// Pressure in hPa.
    pub pressure: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// Wind speed in m/s.
    pub wind_speed: Option<f64>,
    /// Cloud cover in percent.
    pub clouds: Option<f64>,
}

impl RawReading {
    #[must_use]
    pub const fn location(&self) -> GeoLocation {
        GeoLocation::new(self.latitude, self.longitude)
    }

    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Returns the concentration of a pollutant, if reported.
    #[must_use]
    pub const fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm2_5 => self.pm2_5,
            Pollutant::Pm10 => self.pm10,
            Pollutant::O3 => self.o3,
            Pollutant::Co => self.co,
            Pollutant::No2 => self.no2,
            Pollutant::So2 => self.so2,
        }
    }
}

impl Timestamped for RawReading {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollutant_accessor() {
        let reading = RawReading {
            pm2_5: Some(12.5),
            so2: Some(3.0),
            ..RawReading::default()
        };
        assert_eq!(reading.pollutant(Pollutant::Pm2_5), Some(12.5));
        assert_eq!(reading.pollutant(Pollutant::So2), Some(3.0));
        assert_eq!(reading.pollutant(Pollutant::O3), None);
    }

    #[test]
    fn test_datetime_from_timestamp() {
        let reading = RawReading {
            timestamp: 1_700_000_000,
            ..RawReading::default()
        };
        let dt = reading.datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
