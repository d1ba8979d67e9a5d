//! Models command - lists the latest version of every registered model.

use anyhow::{Context, Result};
use aqi_structs::ModelCard;
use tracing::info;

use crate::Stores;

/// Runs the models command.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub async fn run(stores: &Stores) -> Result<Vec<ModelCard>> {
    let cards = stores
        .registry
        .list_models()
        .await
        .context("Failed to list models")?;

    if cards.is_empty() {
        info!("No models registered yet; run `aqi-forecast pipeline` first");
        return Ok(cards);
    }

    info!("=== Registered models ===");
    for card in &cards {
        info!(
            "  {:<36} v{:<3} {:<18} MAE {:>8.3}  R² {:>7.3}  features {}  trained {}",
            card.name,
            card.version,
            card.family,
            card.metrics.mae,
            card.metrics.r2,
            card.features,
            card.trained_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(cards)
}
