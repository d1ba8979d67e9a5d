//! Web dashboard for AQI predictions.
//!
//! HTML pages for people and JSON endpoints for scripts, all backed by the
//! [`PredictionService`]. Prediction routes share a global concurrency limit
//! of one, so upstream API calls and model inference run one at a time.

mod chart;
mod handlers;
mod render;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use handlebars::TemplateError;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use self::render::Templates;
use crate::service::PredictionService;

/// Default forecast horizon in hours.
pub const DEFAULT_FORECAST_HOURS: usize = 72;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub(crate) templates: Arc<Templates>,
}

/// Builds the dashboard router.
///
/// # Errors
///
/// Returns an error if the page templates do not compile.
pub fn router(service: PredictionService) -> Result<Router, TemplateError> {
    let templates = Arc::new(Templates::new()?);

    let predictions = Router::new()
        .route("/forecast", get(handlers::forecast_page))
        .route("/api/predict", get(handlers::api_predict))
        .route("/api/forecast", get(handlers::api_forecast))
        .layer(GlobalConcurrencyLimitLayer::new(1));

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/api/models", get(handlers::api_models))
        .route("/status", get(handlers::status))
        .merge(predictions)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service, templates });

    Ok(app)
}

#[cfg(test)]
mod tests {
    use aqi_structs::{GeoLocation, PredictionResult};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectStorePath;
    use object_store::{ObjectStoreExt, PutPayload};
    use tower::ServiceExt;

    use super::*;
    use crate::Stores;
    use crate::testing::{FixtureSource, registered_stores};

    fn app(stores: &Stores, source: FixtureSource) -> Router {
        router(PredictionService::new(
            Arc::new(source),
            stores.registry.clone(),
            GeoLocation::KARACHI,
        ))
        .unwrap()
    }

    async fn get_page(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_status() {
        let (status, body) = get_page(app(&Stores::in_memory(), FixtureSource::hourly(4)), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"ok\""));
    }

    #[tokio::test]
    async fn test_index_without_models() {
        let (status, body) = get_page(app(&Stores::in_memory(), FixtureSource::hourly(4)), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No models registered yet"));
    }

    #[tokio::test]
    async fn test_index_reports_unreadable_registry() {
        let store = Arc::new(InMemory::new());
        store
            .put(
                &ObjectStorePath::from("models/latest.json"),
                PutPayload::from_static(b"not json"),
            )
            .await
            .unwrap();

        let stores = Stores::new(store);
        let (status, body) = get_page(app(&stores, FixtureSource::hourly(4)), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("model registry unavailable"));
        assert!(!body.contains("No models registered yet"));
    }

    #[tokio::test]
    async fn test_forecast_page_without_models_shows_error() {
        let (status, body) =
            get_page(app(&Stores::in_memory(), FixtureSource::hourly(4)), "/forecast").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("model not available"));
    }

    #[tokio::test]
    async fn test_api_predict_without_models() {
        let (status, body) =
            get_page(app(&Stores::in_memory(), FixtureSource::hourly(4)), "/api/predict").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .starts_with("model not available")
        );
    }

    #[tokio::test]
    async fn test_index_lists_models() {
        let stores = registered_stores().await;
        let (status, body) = get_page(app(&stores, FixtureSource::hourly(4)), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("aqi_predictor_random_forest"));
        assert!(body.contains("<form"));
    }

    #[tokio::test]
    async fn test_forecast_page_renders_table_and_charts() {
        let stores = registered_stores().await;
        let (status, body) = get_page(
            app(&stores, FixtureSource::hourly(30)),
            "/forecast?model=aqi_predictor_random_forest&hours=12",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<svg"));
        assert!(body.contains("Feature importance"));
        assert_eq!(body.matches("<tr class=\"hour\"").count(), 12);
    }

    #[tokio::test]
    async fn test_api_forecast_and_predict() {
        let stores = registered_stores().await;

        let (status, body) =
            get_page(app(&stores, FixtureSource::hourly(30)), "/api/forecast?hours=6").await;
        assert_eq!(status, StatusCode::OK);
        let results: Vec<PredictionResult> = serde_json::from_str(&body).unwrap();
        assert_eq!(results.len(), 6);

        let (status, body) = get_page(app(&stores, FixtureSource::hourly(30)), "/api/predict").await;
        assert_eq!(status, StatusCode::OK);
        let result: PredictionResult = serde_json::from_str(&body).unwrap();
        assert_eq!(result.model_name, "aqi_predictor");
    }

    #[tokio::test]
    async fn test_api_models() {
        let stores = registered_stores().await;
        let (status, body) = get_page(app(&stores, FixtureSource::hourly(4)), "/api/models").await;
        assert_eq!(status, StatusCode::OK);
        let models: Vec<aqi_structs::ModelCard> = serde_json::from_str(&body).unwrap();
        assert_eq!(models.len(), 4);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let stores = registered_stores().await;
        let (status, body) = get_page(app(&stores, FixtureSource::failing()), "/api/predict").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("weather data unavailable"));
    }
}
