//! HTTP surface built on warp: the calculator page plus a small JSON API.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::common::error::{ErrorCode, NpkError, NpkResult};
use crate::features::InputRecord;
use crate::inference::{self, Outcome, PredictionResult};
use crate::models::{ModelInfo, ModelRegistry};

use super::page;

/// Largest JSON body accepted by the predict endpoints.
const MAX_BODY_BYTES: u64 = 64 * 1024;

// =============================================================================
// Request/Response types
// =============================================================================

/// JSON view of one target's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    /// `ok` or `error`.
    pub status: String,
    pub value: Option<f64>,
    /// Card text, e.g. `12.34 mg/Kg` or `no model selected`.
    pub display: String,
    /// Failure kind when `status` is `error`.
    pub error: Option<String>,
}

impl From<&Outcome> for SlotView {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Value(v) => SlotView {
                status: "ok".to_string(),
                value: Some(*v),
                display: outcome.to_string(),
                error: None,
            },
            Outcome::Failed(failure) => SlotView {
                status: "error".to_string(),
                value: None,
                display: outcome.to_string(),
                error: Some(failure.kind.as_str().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub nitrogen: SlotView,
    pub phosphorus: SlotView,
    pub potassium: SlotView,
}

impl From<&PredictionResult> for PredictionResponse {
    fn from(result: &PredictionResult) -> Self {
        Self {
            nitrogen: SlotView::from(&result.nitrogen),
            phosphorus: SlotView::from(&result.phosphorus),
            potassium: SlotView::from(&result.potassium),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

// =============================================================================
// Routes
// =============================================================================

/// Build the complete route tree over a loaded registry.
pub fn routes(
    registry: Arc<ModelRegistry>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_registry(registry.clone()))
        .map(handle_index);

    let predict = warp::path!("api" / "v1" / "predict")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .map(handle_predict);

    let batch = warp::path!("api" / "v1" / "predict" / "batch")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .map(handle_batch);

    let models = warp::path!("api" / "v1" / "models")
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .map(handle_models);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_registry(registry))
        .map(handle_health);

    index
        .or(predict)
        .or(batch)
        .or(models)
        .or(health)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Bind `addr` and serve until Ctrl-C.
pub fn serve(
    registry: Arc<ModelRegistry>,
    addr: SocketAddr,
) -> NpkResult<(SocketAddr, impl Future<Output = ()>)> {
    let (bound, server) = warp::serve(routes(registry))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .map_err(|e| NpkError::config(format!("cannot bind {addr}: {e}")))?;
    Ok((bound, server))
}

fn with_registry(
    registry: Arc<ModelRegistry>,
) -> impl Filter<Extract = (Arc<ModelRegistry>,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

// =============================================================================
// Handlers
// =============================================================================

fn handle_index(
    query: HashMap<String, String>,
    registry: Arc<ModelRegistry>,
) -> warp::reply::Response {
    match InputRecord::from_form(|key| query.get(key).cloned()) {
        Ok(input) => {
            let result = inference::predict(&registry, &input);
            warp::reply::html(page::render(&input, &result)).into_response()
        }
        Err(err) => {
            debug!(error = %err, "rejected form input");
            let page = warp::reply::html(page::render_invalid(&err.to_string()));
            warp::reply::with_status(page, StatusCode::BAD_REQUEST).into_response()
        }
    }
}

fn handle_predict(input: InputRecord, registry: Arc<ModelRegistry>) -> warp::reply::Response {
    let result = inference::predict(&registry, &input);
    json_response(&PredictionResponse::from(&result), StatusCode::OK)
}

fn handle_batch(inputs: Vec<InputRecord>, registry: Arc<ModelRegistry>) -> warp::reply::Response {
    let body: Vec<PredictionResponse> = inference::predict_batch(&registry, &inputs)
        .iter()
        .map(PredictionResponse::from)
        .collect();
    json_response(&body, StatusCode::OK)
}

fn handle_models(registry: Arc<ModelRegistry>) -> warp::reply::Response {
    let models = registry.models();
    let total = models.len();
    json_response(&ModelListResponse { models, total }, StatusCode::OK)
}

fn handle_health(registry: Arc<ModelRegistry>) -> warp::reply::Response {
    let body = HealthResponse {
        status: "ok".to_string(),
        models: registry.len(),
    };
    json_response(&body, StatusCode::OK)
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_response(StatusCode::NOT_FOUND, "not_found", "Not found"));
    }
    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidInput.as_str(),
            &e.to_string(),
        ));
    }
    if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidInput.as_str(),
            &e.to_string(),
        ));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Request body too large",
        ));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed",
        ));
    }
    Ok(error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::Internal.as_str(),
        "Unhandled rejection",
    ))
}

fn json_response<T: Serialize>(body: &T, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(status: StatusCode, code: &str, message: &str) -> warp::reply::Response {
    let body = ApiError {
        error: message.to_string(),
        code: code.to_string(),
    };
    json_response(&body, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regressors::LinearModel;

    fn model(column: &str, coefficient: f64, intercept: f64) -> LinearModel {
        LinearModel {
            features: vec![column.to_string()],
            coefficients: vec![coefficient],
            intercept,
        }
    }

    fn registry() -> Arc<ModelRegistry> {
        Arc::new(
            ModelRegistry::empty()
                .with_model("Model N", model("RH", 0.1, 4.0))
                .with_model("Model K", model("SR", 0.01, 6.9)),
        )
    }

    #[tokio::test]
    async fn predict_returns_three_slots() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/predict")
            .json(&InputRecord {
                relative_humidity: 80.0,
                solar_radiation: 200.0,
                ..Default::default()
            })
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: PredictionResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.nitrogen.status, "ok");
        assert_eq!(body.nitrogen.display, "12.00 mg/Kg");
        assert_eq!(body.phosphorus.status, "error");
        assert_eq!(body.phosphorus.display, "no model selected");
        assert_eq!(body.phosphorus.error.as_deref(), Some("missing_model"));
        assert_eq!(body.potassium.display, "8.90 mg/Kg");
    }

    #[tokio::test]
    async fn partial_body_defaults_to_zero() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/predict")
            .body(r#"{"wind_speed": 3.2}"#)
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: PredictionResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.nitrogen.value, Some(4.0));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/predict")
            .body(r#"{"rainfall": "lots"}"#)
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.code, "invalid_input");
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/predict/batch")
            .json(&vec![
                InputRecord {
                    relative_humidity: 10.0,
                    ..Default::default()
                },
                InputRecord {
                    relative_humidity: 20.0,
                    ..Default::default()
                },
            ])
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Vec<PredictionResponse> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].nitrogen.display, "5.00 mg/Kg");
        assert_eq!(body[1].nitrogen.display, "6.00 mg/Kg");
    }

    #[tokio::test]
    async fn index_renders_with_defaults() {
        let routes = routes(registry());
        let resp = warp::test::request().path("/").reply(&routes).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(html.contains("Nitrogen: 4.00 mg/Kg"));
        assert!(html.contains("Phosphorus: no model selected"));
        assert!(html.contains("Potassium: 6.90 mg/Kg"));
    }

    #[tokio::test]
    async fn index_reads_query() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .path("/?relative_humidity=80&solar_radiation=200")
            .reply(&routes)
            .await;

        let html = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(html.contains("Nitrogen: 12.00 mg/Kg"));
        assert!(html.contains("name=\"relative_humidity\" value=\"80\""));
    }

    #[tokio::test]
    async fn index_treats_cleared_fields_as_zero() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .path("/?air_pressure=&relative_humidity=80&solar_radiation=200&wind_speed=")
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(html.contains("name=\"air_pressure\" value=\"0\""));
        assert!(html.contains("Nitrogen: 12.00 mg/Kg"));
        assert!(html.contains("Potassium: 8.90 mg/Kg"));
    }

    #[tokio::test]
    async fn index_shows_non_numeric_query_inline() {
        let routes = routes(registry());
        let resp = warp::test::request()
            .path("/?rainfall=heavy")
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let ctype = resp.headers()["content-type"].to_str().unwrap();
        assert!(ctype.starts_with("text/html"));
        let html = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(html.contains("Rainfall must be a number, got &#39;heavy&#39;"));
        assert!(html.contains("<form"));
    }

    #[tokio::test]
    async fn models_and_health() {
        let routes = routes(registry());

        let resp = warp::test::request()
            .path("/api/v1/models")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ModelListResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.total, 2);
        assert_eq!(body.models[0].name.as_str(), "Model K");

        let resp = warp::test::request().path("/health").reply(&routes).await;
        let body: HealthResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.models, 2);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let routes = routes(registry());
        let resp = warp::test::request().path("/nope").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
