//! Server-side HTML for the dashboard pages.
//!
//! Pages are handlebars templates, so every `{{value}}` is HTML-escaped.
//! Only the generated SVG charts are inserted raw.

use aqi_structs::{AqiCategory, ModelCard, PredictionResult, SERVED_MODEL_NAME};
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use super::DEFAULT_FORECAST_HOURS;

const HEAD: &str = include_str!("../../templates/head.hbs");
const FOOT: &str = include_str!("../../templates/foot.hbs");
const FORM: &str = include_str!("../../templates/form.hbs");
const INDEX: &str = include_str!("../../templates/index.hbs");
const FORECAST: &str = include_str!("../../templates/forecast.hbs");
const ERROR: &str = include_str!("../../templates/error.hbs");

#[derive(Serialize)]
struct FormOption {
    name: String,
    selected: bool,
}

#[derive(Serialize)]
struct Form {
    options: Vec<FormOption>,
    hours: usize,
}

impl Form {
    fn new(models: &[ModelCard], selected: &str) -> Self {
        let mut names = vec![SERVED_MODEL_NAME.to_owned()];
        names.extend(
            models
                .iter()
                .map(|card| card.name.clone())
                .filter(|name| name != SERVED_MODEL_NAME),
        );
        if !names.iter().any(|name| name == selected) {
            names.push(selected.to_owned());
        }

        Self {
            options: names
                .into_iter()
                .map(|name| FormOption {
                    selected: name == selected,
                    name,
                })
                .collect(),
            hours: DEFAULT_FORECAST_HOURS,
        }
    }
}

#[derive(Serialize)]
struct Badge {
    label: String,
    color: &'static str,
}

impl From<AqiCategory> for Badge {
    fn from(category: AqiCategory) -> Self {
        Self {
            label: category.to_string(),
            color: category.color(),
        }
    }
}

#[derive(Serialize)]
struct ModelRow {
    name: String,
    version: u32,
    family: String,
    mae: String,
    rmse: String,
    r2: String,
    features: String,
    trained: String,
}

impl From<&ModelCard> for ModelRow {
    fn from(card: &ModelCard) -> Self {
        Self {
            name: card.name.clone(),
            version: card.version,
            family: card.family.to_string(),
            mae: format!("{:.2}", card.metrics.mae),
            rmse: format!("{:.2}", card.metrics.rmse),
            r2: format!("{:.3}", card.metrics.r2),
            features: card.features.to_string(),
            trained: card.trained_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Serialize)]
struct IndexContext {
    form: Form,
    models: Vec<ModelRow>,
}

#[derive(Serialize)]
struct Summary {
    aqi: String,
    badge: Badge,
    model: String,
    version: u32,
    family: String,
    lineage: String,
}

#[derive(Serialize)]
struct BreakdownRow {
    pollutant: &'static str,
    concentration: String,
    sub_index: String,
    dominant: bool,
}

#[derive(Serialize)]
struct HourRow {
    time: String,
    aqi: String,
    badge: Badge,
    pm2_5: String,
    pm10: String,
    temp: String,
    humidity: String,
    wind: String,
}

impl From<&PredictionResult> for HourRow {
    fn from(result: &PredictionResult) -> Self {
        Self {
            time: result.inputs.datetime().map_or_else(
                || result.timestamp.to_string(),
                |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
            aqi: format!("{:.1}", result.predicted_aqi),
            badge: result.category.into(),
            pm2_5: format!("{:.1}", result.inputs.pm2_5),
            pm10: format!("{:.1}", result.inputs.pm10),
            temp: format!("{:.1}", result.inputs.temp),
            humidity: format!("{:.0}", result.inputs.humidity),
            wind: format!("{:.1}", result.inputs.wind_speed),
        }
    }
}

#[derive(Serialize)]
struct ForecastContext<'a> {
    form: Form,
    summary: Option<Summary>,
    breakdown: Vec<BreakdownRow>,
    forecast_svg: Option<&'a str>,
    importance_svg: Option<&'a str>,
    hours: Vec<HourRow>,
}

#[derive(Serialize)]
struct ErrorContext<'a> {
    message: &'a str,
}

/// Everything the forecast page shows.
pub struct ForecastView<'a> {
    pub model: &'a str,
    pub results: &'a [PredictionResult],
    pub forecast_svg: Option<&'a str>,
    pub importance_svg: Option<&'a str>,
}

/// Compiled page templates.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    /// Compiles the embedded templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a template does not parse.
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("head", HEAD)?;
        registry.register_partial("foot", FOOT)?;
        registry.register_partial("form", FORM)?;
        registry.register_template_string("index", INDEX)?;
        registry.register_template_string("forecast", FORECAST)?;
        registry.register_template_string("error", ERROR)?;
        Ok(Self { registry })
    }

    /// Landing page: registered models and the forecast form.
    pub fn index_page(&self, models: &[ModelCard]) -> Result<String, RenderError> {
        self.registry.render(
            "index",
            &IndexContext {
                form: Form::new(models, SERVED_MODEL_NAME),
                models: models.iter().map(ModelRow::from).collect(),
            },
        )
    }

    /// Forecast page: summary of the first hour, charts and the hourly table.
    pub fn forecast_page(&self, view: &ForecastView<'_>) -> Result<String, RenderError> {
        let first = view.results.first();

        let summary = first.map(|first| Summary {
            aqi: format!("{:.0}", first.predicted_aqi),
            badge: first.category.into(),
            model: first.model_name.clone(),
            version: first.model_version,
            family: first.family.to_string(),
            lineage: first.lineage.to_string(),
        });

        let breakdown = first
            .map(|first| {
                first
                    .breakdown
                    .iter()
                    .map(|part| BreakdownRow {
                        pollutant: part.pollutant.label(),
                        concentration: format!("{:.2}", part.concentration),
                        sub_index: part
                            .sub_index
                            .map_or_else(|| "n/a".to_owned(), |v| v.to_string()),
                        dominant: Some(part.pollutant) == first.dominant_pollutant,
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.registry.render(
            "forecast",
            &ForecastContext {
                form: Form::new(&[], view.model),
                summary,
                breakdown,
                forecast_svg: view.forecast_svg,
                importance_svg: view.importance_svg,
                hours: view.results.iter().map(HourRow::from).collect(),
            },
        )
    }

    /// Page shown when a prediction cannot be served.
    pub fn error_page(&self, message: &str) -> Result<String, RenderError> {
        self.registry.render("error", &ErrorContext { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Templates {
        Templates::new().unwrap()
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = templates()
            .error_page("model not available: <script>")
            .unwrap();
        assert!(html.contains("model not available: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_empty_forecast() {
        let html = templates()
            .forecast_page(&ForecastView {
                model: SERVED_MODEL_NAME,
                results: &[],
                forecast_svg: None,
                importance_svg: None,
            })
            .unwrap();
        assert!(html.contains("no forecast hours"));
    }

    #[test]
    fn test_form_selects_and_escapes_model() {
        let html = templates()
            .forecast_page(&ForecastView {
                model: "custom\"model",
                results: &[],
                forecast_svg: None,
                importance_svg: None,
            })
            .unwrap();
        assert!(html.contains("value=\"custom&quot;model\" selected"));
        assert!(html.contains(&format!("value=\"{SERVED_MODEL_NAME}\">")));
    }

    #[test]
    fn test_index_without_models() {
        let html = templates().index_page(&[]).unwrap();
        assert!(html.contains("No models registered yet"));
        assert!(!html.contains("Registered models"));
    }
}
