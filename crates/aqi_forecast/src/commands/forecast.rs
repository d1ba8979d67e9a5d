//! Forecast command - hourly AQI for the coming hours.

use anyhow::Result;
use aqi_structs::PredictionResult;
use tracing::info;

use crate::service::PredictionService;

/// Runs the forecast command and logs one line per hour.
///
/// # Errors
///
/// Returns the user-visible prediction error if the forecast fails.
pub async fn run(
    service: &PredictionService,
    model: &str,
    hours: usize,
    json: bool,
) -> Result<Vec<PredictionResult>> {
    let results = service.forecast(model, hours).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(results);
    }

    info!("=== {hours}-hour AQI forecast ({model}) ===");
    for result in &results {
        let time = chrono::DateTime::from_timestamp(result.timestamp, 0)
            .map_or_else(|| result.timestamp.to_string(), |t| t.format("%a %H:%M").to_string());
        info!(
            "  {time}  AQI {:>5.0}  {}",
            result.predicted_aqi, result.category
        );
    }

    if let Some(peak) = results
        .iter()
        .max_by(|a, b| a.predicted_aqi.total_cmp(&b.predicted_aqi))
    {
        info!(
            "Peak AQI {:.0} ({}) at {}",
            peak.predicted_aqi, peak.category, peak.timestamp
        );
    }

    Ok(results)
}
