//! Common structs for air quality readings, engineered features and model
//! metadata shared across crates.

mod feature;
mod location;
mod model;
mod pollutant;
mod prediction;
mod reading;

pub use feature::*;
pub use location::*;
pub use model::*;
pub use pollutant::*;
pub use prediction::*;
pub use reading::*;

/// Name of the feature group holding raw hourly readings.
pub const RAW_FEATURE_GROUP: &str = "aqi_weather_data_hourly";

/// Name of the feature group holding ML-ready feature rows.
pub const ML_FEATURE_GROUP: &str = "aqi_ml_training_features";

/// Registry name of the model served by the dashboard.
pub const SERVED_MODEL_NAME: &str = "aqi_predictor";

/// Records keyed by a unix timestamp (seconds, UTC).
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}
