//! Required-field and physical-range checks for raw readings.

use aqi_structs::RawReading;
use thiserror::Error;

/// A reading that is missing data or physically implausible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("reading at {timestamp} is missing required field `{field}`")]
    MissingField { timestamp: i64, field: &'static str },

    #[error("reading at {timestamp} has non-finite `{field}`")]
    NonFinite { timestamp: i64, field: &'static str },

    #[error("reading at {timestamp} has `{field}` = {value} outside [{min}, {max}]")]
    OutOfRange {
        timestamp: i64,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("reading at {timestamp} has invalid location ({latitude}, {longitude})")]
    InvalidLocation {
        timestamp: i64,
        latitude: f64,
        longitude: f64,
    },

    #[error("reading has invalid timestamp {timestamp}")]
    InvalidTimestamp { timestamp: i64 },

    #[error("no AQI sub-index can be computed for reading at {timestamp}")]
    NoAqi { timestamp: i64 },

    #[error("all {count} readings were rejected; first error: {first}")]
    AllRejected {
        count: usize,
        first: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Timestamp of the offending reading, if the error concerns one reading.
    #[must_use]
    pub const fn timestamp(&self) -> Option<i64> {
        match self {
            Self::MissingField { timestamp, .. }
            | Self::NonFinite { timestamp, .. }
            | Self::OutOfRange { timestamp, .. }
            | Self::InvalidLocation { timestamp, .. }
            | Self::InvalidTimestamp { timestamp }
            | Self::NoAqi { timestamp } => Some(*timestamp),
            Self::AllRejected { .. } => None,
        }
    }
}

/// Physical bounds, inclusive.
mod bounds {
    pub const CONCENTRATION: (f64, f64) = (0.0, f64::MAX);
    pub const TEMPERATURE: (f64, f64) = (-90.0, 60.0);
    pub const HUMIDITY: (f64, f64) = (0.0, 100.0);
    pub const PRESSURE: (f64, f64) = (800.0, 1100.0);
    pub const WIND_SPEED: (f64, f64) = (0.0, f64::MAX);
}

/// A reading with every required field present and within range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidReading {
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
}

fn require(
    timestamp: i64,
    field: &'static str,
    value: Option<f64>,
    (min, max): (f64, f64),
) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField { timestamp, field })?;

    if !value.is_finite() {
        return Err(ValidationError::NonFinite { timestamp, field });
    }

    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            timestamp,
            field,
            value,
            min,
            max,
        });
    }

    Ok(value)
}

/// Checks a raw reading and returns its required fields.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, checking the timestamp and
/// location first, then fields in declaration order.
pub fn validate_reading(reading: &RawReading) -> Result<ValidReading, ValidationError> {
    let timestamp = reading.timestamp;

    if timestamp <= 0 {
        return Err(ValidationError::InvalidTimestamp { timestamp });
    }

    if !reading.location().is_valid() {
        return Err(ValidationError::InvalidLocation {
            timestamp,
            latitude: reading.latitude,
            longitude: reading.longitude,
        });
    }

    Ok(ValidReading {
        timestamp,
        pm2_5: require(timestamp, "pm2_5", reading.pm2_5, bounds::CONCENTRATION)?,
        pm10: require(timestamp, "pm10", reading.pm10, bounds::CONCENTRATION)?,
        o3: require(timestamp, "o3", reading.o3, bounds::CONCENTRATION)?,
        no2: require(timestamp, "no2", reading.no2, bounds::CONCENTRATION)?,
        so2: require(timestamp, "so2", reading.so2, bounds::CONCENTRATION)?,
        co: require(timestamp, "co", reading.co, bounds::CONCENTRATION)?,
        temp: require(timestamp, "temp", reading.temp, bounds::TEMPERATURE)?,
        humidity: require(timestamp, "humidity", reading.humidity, bounds::HUMIDITY)?,
        pressure: require(timestamp, "pressure", reading.pressure, bounds::PRESSURE)?,
        wind_speed: require(timestamp, "wind_speed", reading.wind_speed, bounds::WIND_SPEED)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RawReading {
        RawReading {
            timestamp: 1_700_000_000,
            latitude: 24.86,
            longitude: 67.0,
            owm_aqi: Some(2),
            co: Some(200.0),
            no2: Some(5.0),
            o3: Some(40.0),
            so2: Some(2.0),
            pm2_5: Some(10.0),
            pm10: Some(25.0),
            temp: Some(28.0),
            feels_like: None,
            pressure: Some(1008.0),
            humidity: Some(65.0),
            wind_speed: Some(4.0),
            clouds: None,
        }
    }

    #[test]
    fn test_valid_reading_passes() {
        let checked = validate_reading(&valid()).unwrap();
        assert!((checked.pm10 - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_optional_fields_not_required() {
        let reading = RawReading {
            owm_aqi: None,
            feels_like: None,
            clouds: None,
            ..valid()
        };
        assert!(validate_reading(&reading).is_ok());
    }

    #[test]
    fn test_missing_field() {
        let reading = RawReading {
            temp: None,
            ..valid()
        };
        assert_eq!(
            validate_reading(&reading),
            Err(ValidationError::MissingField {
                timestamp: 1_700_000_000,
                field: "temp"
            })
        );
    }

    #[test]
    fn test_negative_concentration() {
        let reading = RawReading {
            no2: Some(-0.5),
            ..valid()
        };
        let err = validate_reading(&reading).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "no2", .. }
        ));
    }

    #[test]
    fn test_humidity_and_pressure_ranges() {
        let humid = RawReading {
            humidity: Some(101.0),
            ..valid()
        };
        assert!(validate_reading(&humid).is_err());

        let low_pressure = RawReading {
            pressure: Some(120.0),
            ..valid()
        };
        assert!(validate_reading(&low_pressure).is_err());
    }

    #[test]
    fn test_non_finite() {
        let reading = RawReading {
            pm2_5: Some(f64::INFINITY),
            ..valid()
        };
        assert!(matches!(
            validate_reading(&reading),
            Err(ValidationError::NonFinite { field: "pm2_5", .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_and_location() {
        let reading = RawReading {
            timestamp: 0,
            ..valid()
        };
        assert!(matches!(
            validate_reading(&reading),
            Err(ValidationError::InvalidTimestamp { .. })
        ));

        let reading = RawReading {
            latitude: 120.0,
            ..valid()
        };
        assert!(matches!(
            validate_reading(&reading),
            Err(ValidationError::InvalidLocation { .. })
        ));
    }
}
