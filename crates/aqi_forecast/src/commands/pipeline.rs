//! Pipeline command - fetch, features and train in one sequential run.
//!
//! This is the entry point for scheduled automation: it takes no
//! parameters beyond the environment configuration.

use anyhow::Result;
use chrono::{DateTime, Utc};
use config::Config;
use ml_model::TrainerConfig;
use openweather_client::WeatherSource;
use store::FeatureGroupManifest;
use tracing::info;

use super::{features, fetch, train};
use crate::Stores;

/// Versions produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub raw: FeatureGroupManifest,
    pub features: FeatureGroupManifest,
    pub training: train::TrainOutcome,
}

/// Runs the full pipeline. Each stage starts only after the previous one
/// has published its output.
///
/// # Errors
///
/// Returns the first stage error; later stages do not run.
pub async fn run(
    config: &Config,
    stores: &Stores,
    source: &dyn WeatherSource,
    trainer: &TrainerConfig,
    now: DateTime<Utc>,
) -> Result<PipelineSummary> {
    info!("=== Stage 1/3: fetch ===");
    let raw = fetch::run(config, stores, source, now).await?;

    info!("=== Stage 2/3: features ===");
    let features = features::run(config, stores).await?;

    info!("=== Stage 3/3: train ===");
    let training = train::run(stores, trainer).await?;

    info!(
        raw = %raw.feature_ref(),
        features = %features.feature_ref(),
        models = training.registered.len(),
        "Pipeline complete"
    );

    Ok(PipelineSummary {
        raw,
        features,
        training,
    })
}
