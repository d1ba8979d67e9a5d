//! Feature builder for the AQI model.
//!
//! This crate validates raw readings, computes the US EPA AQI target and
//! derives the engineered features used for training and inference. The
//! same code path serves both, so a reading transformed at prediction time
//! matches what the model saw during training.

pub mod aqi;
mod validation;

use core::f64::consts::TAU;

use aqi_structs::{FeatureRow, Pollutant, RawReading};
use chrono::{DateTime, Datelike, Timelike};
use tracing::{debug, warn};

pub use validation::{ValidReading, ValidationError, validate_reading};

/// Rolling aggregates cover readings in `(t - 3h, t]`.
pub const ROLLING_WINDOW_SECONDS: i64 = 3 * 3600;

/// Lag features use the latest reading in `[t - 2h, t)`.
pub const LAG_WINDOW_SECONDS: i64 = 2 * 3600;

/// What to do with readings that fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Fail on the first invalid reading.
    Reject,
    /// Skip invalid readings and report them in [`BuildOutput::dropped`].
    #[default]
    Drop,
}

/// Feature rows built from a batch of readings.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Rows ordered by timestamp.
    pub rows: Vec<FeatureRow>,
    /// Readings skipped in [`ValidationMode::Drop`].
    pub dropped: Vec<ValidationError>,
}

/// Builds feature rows from raw readings.
///
/// The output is a pure function of the input: readings are stably sorted by
/// timestamp, validated, and every valid reading yields exactly one row.
/// Rolling and lag features only look at other valid readings within their
/// windows and fall back to the reading's own value when none exist.
///
/// # Errors
///
/// Returns a [`ValidationError`] for the first invalid reading in
/// [`ValidationMode::Reject`], or [`ValidationError::AllRejected`] when a
/// non-empty input has no valid reading in [`ValidationMode::Drop`].
pub fn build_features(
    readings: &[RawReading],
    mode: ValidationMode,
) -> Result<BuildOutput, ValidationError> {
    let mut sorted: Vec<&RawReading> = readings.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut valid = Vec::with_capacity(sorted.len());
    let mut dropped = Vec::new();

    for reading in sorted {
        match check(reading) {
            Ok(checked) => valid.push(checked),
            Err(e) if mode == ValidationMode::Drop => {
                debug!(error = %e, "Dropping invalid reading");
                dropped.push(e);
            }
            Err(e) => return Err(e),
        }
    }

    if valid.is_empty()
        && let Some(first) = dropped.first()
    {
        return Err(ValidationError::AllRejected {
            count: dropped.len(),
            first: Box::new(first.clone()),
        });
    }

    if !dropped.is_empty() {
        warn!(
            dropped = dropped.len(),
            kept = valid.len(),
            "Dropped invalid readings"
        );
    }

    let rows = valid
        .iter()
        .map(|checked| derive_row(&valid, checked))
        .collect();

    Ok(BuildOutput { rows, dropped })
}

/// Builds the feature row for a single reading with no history.
///
/// Used at prediction time for the current-conditions reading.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the reading is invalid.
pub fn build_feature_row(reading: &RawReading) -> Result<FeatureRow, ValidationError> {
    let checked = check(reading)?;
    Ok(derive_row(core::slice::from_ref(&checked), &checked))
}

/// A validated reading with its AQI target.
#[derive(Debug, Clone, Copy)]
struct Checked {
    reading: ValidReading,
    aqi: u32,
    hour: u32,
    day: u32,
}

fn check(reading: &RawReading) -> Result<Checked, ValidationError> {
    let valid = validate_reading(reading)?;
    let timestamp = valid.timestamp;

    let datetime = DateTime::from_timestamp(timestamp, 0)
        .ok_or(ValidationError::InvalidTimestamp { timestamp })?;

    let parts = aqi::breakdown(|p| Some(concentration(&valid, p)));
    let aqi = aqi::overall_aqi(&parts).ok_or(ValidationError::NoAqi { timestamp })?;

    Ok(Checked {
        reading: valid,
        aqi,
        hour: datetime.hour(),
        day: datetime.day(),
    })
}

const fn concentration(reading: &ValidReading, pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Pm2_5 => reading.pm2_5,
        Pollutant::Pm10 => reading.pm10,
        Pollutant::O3 => reading.o3,
        Pollutant::Co => reading.co,
        Pollutant::No2 => reading.no2,
        Pollutant::So2 => reading.so2,
    }
}

/// Derives one row from a reading and the sorted valid readings around it.
fn derive_row(history: &[Checked], current: &Checked) -> FeatureRow {
    let r = &current.reading;
    let t = r.timestamp;

    // Rolling window (t - 3h, t], including readings that share timestamp t.
    let lower = history.partition_point(|c| c.reading.timestamp <= t - ROLLING_WINDOW_SECONDS);
    let upper = history.partition_point(|c| c.reading.timestamp <= t);
    let window = history.get(lower..upper).unwrap_or_default();

    let (pm2_5_rolling, pm10_rolling) = if window.is_empty() {
        (r.pm2_5, r.pm10)
    } else {
        let n = window.len() as f64;
        (
            window.iter().map(|c| c.reading.pm2_5).sum::<f64>() / n,
            window.iter().map(|c| c.reading.pm10).sum::<f64>() / n,
        )
    };

    // Latest strictly earlier reading within the lag window.
    let earlier = history.partition_point(|c| c.reading.timestamp < t);
    let lag = earlier
        .checked_sub(1)
        .and_then(|i| history.get(i))
        .filter(|c| c.reading.timestamp >= t - LAG_WINDOW_SECONDS)
        .map_or(r, |c| &c.reading);

    let angle = TAU * f64::from(current.hour) / 24.0;

    FeatureRow {
        timestamp: t,
        pm2_5: r.pm2_5,
        pm10: r.pm10,
        o3: r.o3,
        no2: r.no2,
        so2: r.so2,
        co: r.co,
        temp: r.temp,
        humidity: r.humidity,
        pressure: r.pressure,
        wind_speed: r.wind_speed,
        hour_of_day: current.hour,
        day_of_month: current.day,
        hour_sin: angle.sin(),
        hour_cos: angle.cos(),
        pm2_5_rolling_mean_3h: pm2_5_rolling,
        pm10_rolling_mean_3h: pm10_rolling,
        pm2_5_lag_1h: lag.pm2_5,
        pm10_lag_1h: lag.pm10,
        calculated_aqi: f64::from(current.aqi),
    }
}
