//! Predict command - AQI for the current conditions.

use anyhow::Result;
use aqi_structs::PredictionResult;
use tracing::info;

use crate::service::PredictionService;

/// Runs the predict command and logs the result.
///
/// With `json` set, the result is printed to stdout as JSON instead.
///
/// # Errors
///
/// Returns the user-visible [`PredictionError`](crate::service::PredictionError)
/// message if the prediction fails.
pub async fn run(service: &PredictionService, model: &str, json: bool) -> Result<PredictionResult> {
    let result = service.predict_current(model).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result);
    }

    let time = chrono::DateTime::from_timestamp(result.timestamp, 0)
        .map_or_else(|| result.timestamp.to_string(), |t| t.to_rfc3339());

    info!("=== Current AQI ===");
    info!("  Time:      {time}");
    info!(
        "  AQI:       {:.0} ({})",
        result.predicted_aqi, result.category
    );
    info!(
        "  Model:     {} v{} ({}) trained on {}",
        result.model_name, result.model_version, result.family, result.lineage
    );
    if let Some(dominant) = result.dominant_pollutant {
        info!("  Dominant:  {}", dominant.label());
    }
    info!("  Pollutant breakdown:");
    for part in &result.breakdown {
        let sub_index = part
            .sub_index
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        info!(
            "    {:<6} {:>9.2} µg/m³  sub-index {:>4}",
            part.pollutant.label(),
            part.concentration,
            sub_index
        );
    }

    Ok(result)
}
