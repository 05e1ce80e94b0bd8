use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hpxml_reso::error::AppError;
use hpxml_reso::workflows::reso::ResoRecord;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct ConvertRequest {
    pub(crate) hpxml: String,
    #[serde(default)]
    pub(crate) building_id: Option<String>,
    #[serde(default)]
    pub(crate) geocode: bool,
}

pub(crate) fn router() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/reso/convert",
            axum::routing::post(convert_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Address lookups block on HTTP, so conversion runs off the async workers.
pub(crate) async fn convert_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ResoRecord>, AppError> {
    let ConvertRequest {
        hpxml,
        building_id,
        geocode,
    } = payload;
    let services = state.services.clone();

    let record = tokio::task::spawn_blocking(move || -> Result<ResoRecord, AppError> {
        let converter = services.converter(geocode)?;
        Ok(converter.convert_str(&hpxml, building_id.as_deref())?)
    })
    .await
    .map_err(|err| AppError::Task(err.to_string()))??;

    info!(
        heating = record.heating.len(),
        cooling = record.cooling.len(),
        "converted HPXML document"
    );
    Ok(Json(record))
}
