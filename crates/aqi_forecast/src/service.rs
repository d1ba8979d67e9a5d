//! Prediction service: current conditions and hourly forecast through a
//! registered model.

use std::sync::Arc;

use aqi_structs::{AqiCategory, FeatureRow, GeoLocation, Pollutant, PredictionResult};
use feature_builder::{ValidationError, ValidationMode, aqi, build_feature_row, build_features};
use ml_model::TrainedModel;
use openweather_client::{FetchError, WeatherSource, fetch_current, fetch_forecast};
use store::{ModelArtifact, ModelRegistry, RegistryError};
use thiserror::Error;
use tracing::{info, warn};

/// User-facing prediction failures.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model not available: nothing is registered under {name}")]
    ModelNotAvailable { name: String },

    #[error("model registry unavailable: {0}")]
    Registry(RegistryError),

    #[error("weather data unavailable: {0}")]
    WeatherUnavailable(FetchError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("model {name} v{version} produced an unusable prediction: {value}")]
    InvalidPrediction {
        name: String,
        version: u32,
        value: f64,
    },
}

impl From<FetchError> for PredictionError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidRequest(reason) => Self::InvalidRequest(reason),
            other => Self::WeatherUnavailable(other),
        }
    }
}

impl From<RegistryError> for PredictionError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NoModel { name } => Self::ModelNotAvailable { name },
            other => Self::Registry(other),
        }
    }
}

/// Serves predictions from the latest registered model versions.
#[derive(Clone)]
pub struct PredictionService {
    source: Arc<dyn WeatherSource>,
    registry: ModelRegistry,
    location: GeoLocation,
}

impl PredictionService {
    #[must_use]
    pub fn new(
        source: Arc<dyn WeatherSource>,
        registry: ModelRegistry,
        location: GeoLocation,
    ) -> Self {
        Self {
            source,
            registry,
            location,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Loads the latest version of `model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::ModelNotAvailable`] if nothing is registered.
    pub async fn load_model(
        &self,
        model_name: &str,
    ) -> Result<ModelArtifact<TrainedModel>, PredictionError> {
        Ok(self.registry.load_latest(model_name).await?)
    }

    /// Predicts the AQI for the current conditions.
    ///
    /// The model is resolved before any upstream request is made.
    ///
    /// # Errors
    ///
    /// Returns a [`PredictionError`] if the model is missing, the weather API
    /// fails or the current reading is invalid.
    pub async fn predict_current(
        &self,
        model_name: &str,
    ) -> Result<PredictionResult, PredictionError> {
        let artifact = self.load_model(model_name).await?;
        let reading = fetch_current(self.source.as_ref(), self.location).await?;
        let row = build_feature_row(&reading)?;

        let result = to_result(&artifact, row)?;
        info!(
            model = model_name,
            version = artifact.card.version,
            aqi = result.predicted_aqi,
            category = %result.category,
            "Predicted current AQI"
        );
        Ok(result)
    }

    /// Predicts the AQI for each of the next `hours` forecast steps.
    ///
    /// Rolling and lag features are computed over the forecast sequence itself.
    ///
    /// # Errors
    ///
    /// Returns a [`PredictionError`] if the model is missing, the weather API
    /// fails, `hours` is out of range or any forecast step is invalid.
    pub async fn forecast(
        &self,
        model_name: &str,
        hours: usize,
    ) -> Result<Vec<PredictionResult>, PredictionError> {
        let artifact = self.load_model(model_name).await?;
        let readings = fetch_forecast(self.source.as_ref(), self.location, hours).await?;
        let rows = build_features(&readings, ValidationMode::Reject)?.rows;

        if rows.len() < hours {
            warn!(
                requested = hours,
                available = rows.len(),
                "Forecast shorter than requested"
            );
        }

        let results = rows
            .into_iter()
            .map(|row| to_result(&artifact, row))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            model = model_name,
            version = artifact.card.version,
            hours = results.len(),
            "Forecast AQI"
        );
        Ok(results)
    }
}

fn to_result(
    artifact: &ModelArtifact<TrainedModel>,
    row: FeatureRow,
) -> Result<PredictionResult, PredictionError> {
    let raw = artifact.model.predict(&row);
    let category = Some(raw)
        .filter(|value| value.is_finite())
        .and_then(AqiCategory::from_aqi)
        .ok_or_else(|| PredictionError::InvalidPrediction {
            name: artifact.card.name.clone(),
            version: artifact.card.version,
            value: raw,
        })?;
    let predicted_aqi = raw.max(0.0);
    let breakdown = aqi::breakdown(|p| Some(row_concentration(&row, p)));
    let dominant_pollutant = aqi::dominant_pollutant(&breakdown);

    Ok(PredictionResult {
        timestamp: row.timestamp,
        predicted_aqi,
        category,
        model_name: artifact.card.name.clone(),
        model_version: artifact.card.version,
        family: artifact.card.family,
        lineage: artifact.card.features.clone(),
        inputs: row,
        breakdown,
        dominant_pollutant,
    })
}

const fn row_concentration(row: &FeatureRow, pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Pm2_5 => row.pm2_5,
        Pollutant::Pm10 => row.pm10,
        Pollutant::O3 => row.o3,
        Pollutant::Co => row.co,
        Pollutant::No2 => row.no2,
        Pollutant::So2 => row.so2,
    }
}
