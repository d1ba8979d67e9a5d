//! Train command - fits every model family and registers the results.

use anyhow::{Context, Result};
use aqi_structs::{FeatureRow, ML_FEATURE_GROUP, ModelCard};
use ml_model::{TrainerConfig, TrainingReport, train_and_select};
use tracing::info;

use crate::Stores;

/// Result of a training run: the report and the registered cards.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub report: TrainingReport,
    /// Registered cards with their assigned versions, served model last.
    pub registered: Vec<ModelCard>,
}

/// Runs the train command on the latest ML feature group version.
///
/// # Errors
///
/// Returns an error if no features are stored, training fails, or the
/// models cannot be registered. Nothing is registered on failure.
pub async fn run(stores: &Stores, trainer: &TrainerConfig) -> Result<TrainOutcome> {
    let (manifest, rows) = stores
        .features
        .read_latest::<FeatureRow>(ML_FEATURE_GROUP)
        .await
        .context("Failed to read feature rows")?;

    info!(
        features = %manifest.feature_ref(),
        rows = rows.len(),
        metric = %trainer.selection_metric,
        "Starting training"
    );

    let report = train_and_select(rows, manifest.feature_ref(), trainer)
        .context("Failed to train models")?;

    let registered = stores
        .registry
        .register_all(report.registrations())
        .await
        .context("Failed to register models")?;

    for card in &registered {
        info!(
            "  {:<36} v{:<3} MAE {:>8.3}  RMSE {:>8.3}  R² {:>7.3}",
            card.name, card.version, card.metrics.mae, card.metrics.rmse, card.metrics.r2
        );
    }

    if let Some(best) = report.best() {
        info!(
            family = %best.family,
            run_id = %report.run_id,
            "Training complete"
        );
    }

    Ok(TrainOutcome { report, registered })
}
