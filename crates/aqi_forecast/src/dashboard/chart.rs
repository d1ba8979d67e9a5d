//! SVG charts drawn with plotters and inlined into the dashboard pages.

use aqi_structs::PredictionResult;
use plotters::prelude::*;
use thiserror::Error;

/// Lower bounds of the Moderate through Very Unhealthy bands.
const CATEGORY_THRESHOLDS: [f64; 4] = [50.0, 100.0, 150.0, 200.0];

/// Only the most important features are plotted.
const MAX_IMPORTANCE_BARS: usize = 10;

#[derive(Debug, Error)]
#[error("chart rendering failed: {0}")]
pub struct ChartError(String);

impl<E> From<DrawingAreaErrorKind<E>> for ChartError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        Self(e.to_string())
    }
}

/// Parses a `#rrggbb` colour, falling back to black on malformed input.
fn hex_color(hex: &str) -> RGBColor {
    let channel = |at: usize| {
        hex.get(at..at + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    RGBColor(channel(1), channel(3), channel(5))
}

/// Line chart of predicted AQI per forecast hour, points coloured by category.
pub fn forecast_chart(results: &[PredictionResult]) -> Result<String, ChartError> {
    let hours = results.len().max(1) as u32;
    let peak = results.iter().map(|r| r.predicted_aqi).fold(0.0, f64::max);
    let y_max = (peak * 1.15).max(60.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (900, 360)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(0u32..hours, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Hours ahead")
            .y_desc("AQI")
            .draw()?;

        let band = RGBColor(200, 200, 200);
        for threshold in CATEGORY_THRESHOLDS.into_iter().filter(|&t| t < y_max) {
            chart.draw_series(LineSeries::new(
                [(0, threshold), (hours, threshold)],
                &band,
            ))?;
        }

        chart.draw_series(LineSeries::new(
            results
                .iter()
                .enumerate()
                .map(|(i, r)| (i as u32, r.predicted_aqi)),
            &BLUE,
        ))?;
        chart.draw_series(results.iter().enumerate().map(|(i, r)| {
            Circle::new(
                (i as u32, r.predicted_aqi),
                3,
                hex_color(r.category.color()).filled(),
            )
        }))?;

        root.present()?;
    }
    Ok(svg)
}

/// Horizontal bar chart of the highest ranked feature importances.
pub fn importance_chart(ranked: &[(String, f64)]) -> Result<String, ChartError> {
    let top = &ranked[..ranked.len().min(MAX_IMPORTANCE_BARS)];
    let rows = top.len().max(1) as f64;
    let x_max = top
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0, f64::max)
        .max(f64::EPSILON)
        * 1.6;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (900, 40 + 28 * top.len().max(1) as u32))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(30)
            .build_cartesian_2d(0f64..x_max, 0f64..rows)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(0)
            .x_desc("Importance")
            .draw()?;

        // Highest importance at the top.
        let slot = |i: usize| rows - 1.0 - i as f64;

        chart.draw_series(top.iter().enumerate().map(|(i, (_, value))| {
            Rectangle::new(
                [(0.0, slot(i) + 0.15), (*value, slot(i) + 0.85)],
                BLUE.mix(0.6).filled(),
            )
        }))?;
        chart.draw_series(top.iter().enumerate().map(|(i, (name, value))| {
            Text::new(
                format!("{name} ({value:.3})"),
                (*value, slot(i) + 0.7),
                ("sans-serif", 12),
            )
        }))?;

        root.present()?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#ff7e00"), RGBColor(255, 126, 0));
        assert_eq!(hex_color("bad"), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_empty_forecast_chart_is_still_svg() {
        let svg = forecast_chart(&[]).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_importance_chart_labels_top_features() {
        let ranked: Vec<(String, f64)> = (0..15)
            .map(|i| (format!("feature_{i}"), 1.0 / f64::from(i + 1)))
            .collect();
        let svg = importance_chart(&ranked).unwrap();

        assert!(svg.contains("feature_0"));
        assert!(svg.contains("feature_9"));
        assert!(!svg.contains("feature_10"));
    }
}
