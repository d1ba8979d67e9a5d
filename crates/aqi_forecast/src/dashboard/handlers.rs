use aqi_structs::{ModelCard, PredictionResult, SERVED_MODEL_NAME};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use handlebars::RenderError;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::render::{ForecastView, Templates};
use super::{AppState, DEFAULT_FORECAST_HOURS, chart};
use crate::service::PredictionError;

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    model: Option<String>,
}

impl ModelQuery {
    fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(SERVED_MODEL_NAME)
    }
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    model: Option<String>,
    hours: Option<usize>,
}

impl ForecastQuery {
    fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(SERVED_MODEL_NAME)
    }

    fn hours(&self) -> usize {
        self.hours.unwrap_or(DEFAULT_FORECAST_HOURS)
    }
}

const fn status_for(e: &PredictionError) -> StatusCode {
    match e {
        PredictionError::ModelNotAvailable { .. } => StatusCode::NOT_FOUND,
        PredictionError::WeatherUnavailable(_) => StatusCode::BAD_GATEWAY,
        PredictionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PredictionError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::Registry(_) | PredictionError::InvalidPrediction { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn log_failure(e: &PredictionError) {
    match e {
        PredictionError::Registry(_) | PredictionError::InvalidPrediction { .. } => {
            error!(error = %e, "Prediction failed");
        }
        _ => warn!(error = %e, "Prediction failed"),
    }
}

fn json_error(e: &PredictionError) -> Response {
    log_failure(e);
    (status_for(e), Json(json!({ "error": e.to_string() }))).into_response()
}

fn html_page(page: Result<String, RenderError>) -> Response {
    match page {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    }
}

fn html_error(templates: &Templates, e: &PredictionError) -> Response {
    log_failure(e);
    let mut response = html_page(templates.error_page(&e.to_string()));
    if response.status().is_success() {
        *response.status_mut() = status_for(e);
    }
    response
}

pub async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn index(State(state): State<AppState>) -> Response {
    match state.service.registry().list_models().await {
        Ok(models) => html_page(state.templates.index_page(&models)),
        Err(e) => html_error(&state.templates, &PredictionError::from(e)),
    }
}

pub async fn api_models(State(state): State<AppState>) -> Response {
    match state.service.registry().list_models().await {
        Ok(models) => Json::<Vec<ModelCard>>(models).into_response(),
        Err(e) => json_error(&PredictionError::from(e)),
    }
}

pub async fn api_predict(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Response {
    match state.service.predict_current(query.model()).await {
        Ok(result) => Json::<PredictionResult>(result).into_response(),
        Err(e) => json_error(&e),
    }
}

pub async fn api_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Response {
    match state.service.forecast(query.model(), query.hours()).await {
        Ok(results) => Json::<Vec<PredictionResult>>(results).into_response(),
        Err(e) => json_error(&e),
    }
}

pub async fn forecast_page(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Response {
    let model = query.model();
    let results = match state.service.forecast(model, query.hours()).await {
        Ok(results) => results,
        Err(e) => return html_error(&state.templates, &e),
    };

    let importances = match state.service.load_model(model).await {
        Ok(artifact) => artifact.model.ranked_importances(),
        Err(e) => return html_error(&state.templates, &e),
    };

    let forecast_svg = chart::forecast_chart(&results)
        .inspect_err(|e| warn!(error = %e, "Failed to draw forecast chart"))
        .ok();
    let importance_svg = importances.as_deref().and_then(|ranked| {
        chart::importance_chart(ranked)
            .inspect_err(|e| warn!(error = %e, "Failed to draw importance chart"))
            .ok()
    });
    debug!(model, hours = results.len(), "Rendering forecast page");

    html_page(state.templates.forecast_page(&ForecastView {
        model,
        results: &results,
        forecast_svg: forecast_svg.as_deref(),
        importance_svg: importance_svg.as_deref(),
    }))
}
