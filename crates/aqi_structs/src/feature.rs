use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Timestamped;

/// The number of model input features per row.
pub const FEATURE_COUNT: usize = 18;

/// Names of the model input features, in the order of [`FeatureRow::features`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "pm2_5",
    "pm10",
    "o3",
    "no2",
    "so2",
    "co",
    "temp",
    "humidity",
    "pressure",
    "wind_speed",
    "hour_of_day",
    "day_of_month",
    "hour_sin",
    "hour_cos",
    "pm2_5_rolling_mean_3h",
    "pm10_rolling_mean_3h",
    "pm2_5_lag_1h",
    "pm10_lag_1h",
];

/// Name of the regression target column.
pub const TARGET_NAME: &str = "calculated_aqi";

/// ML-ready features derived from one raw reading and its recent history.
///
/// No field is optional: rows are only produced from validated readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Unix timestamp in seconds (UTC), the primary key.
    pub timestamp: i64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub hour_of_day: u32,
    pub day_of_month: u32,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub pm2_5_rolling_mean_3h: f64,
    pub pm10_rolling_mean_3h: f64,
    pub pm2_5_lag_1h: f64,
    pub pm10_lag_1h: f64,
    /// US EPA AQI computed from the pollutant concentrations.
    pub calculated_aqi: f64,
}

impl FeatureRow {
    /// Returns the model input vector, ordered as [`FEATURE_NAMES`].
    #[must_use]
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.pm2_5,
            self.pm10,
            self.o3,
            self.no2,
            self.so2,
            self.co,
            self.temp,
            self.humidity,
            self.pressure,
            self.wind_speed,
            f64::from(self.hour_of_day),
            f64::from(self.day_of_month),
            self.hour_sin,
            self.hour_cos,
            self.pm2_5_rolling_mean_3h,
            self.pm10_rolling_mean_3h,
            self.pm2_5_lag_1h,
            self.pm10_lag_1h,
        ]
    }

    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Returns true if every numeric field is finite.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.features().iter().all(|v| v.is_finite()) && self.calculated_aqi.is_finite()
    }
}

impl Timestamped for FeatureRow {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> FeatureRow {
        FeatureRow {
            timestamp: 3_600,
            pm2_5: 1.0,
            pm10: 2.0,
            o3: 3.0,
            no2: 4.0,
            so2: 5.0,
            co: 6.0,
            temp: 7.0,
            humidity: 8.0,
            pressure: 9.0,
            wind_speed: 10.0,
            hour_of_day: 11,
            day_of_month: 12,
            hour_sin: 13.0,
            hour_cos: 14.0,
            pm2_5_rolling_mean_3h: 15.0,
            pm10_rolling_mean_3h: 16.0,
            pm2_5_lag_1h: 17.0,
            pm10_lag_1h: 18.0,
            calculated_aqi: 42.0,
        }
    }

    #[test]
    fn test_feature_order_matches_names() {
        let features = sample_row().features();
        assert_eq!(features.len(), FEATURE_NAMES.len());
        for (i, value) in features.iter().enumerate() {
            assert!((value - (i as f64 + 1.0)).abs() < f64::EPSILON, "{}", FEATURE_NAMES[i]);
        }
    }

    #[test]
    fn test_is_complete() {
        let mut row = sample_row();
        assert!(row.is_complete());
        row.temp = f64::NAN;
        assert!(!row.is_complete());
    }
}
