// HTTP request handlers
use crate::application::chart_builder::build_chart;
use crate::application::chart_service::{ChartSelection, ServiceError};
use crate::domain::chart::ChartRequest;
use crate::domain::error::ChartError;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, error_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, Response, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsQuery {
    pub experiment_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    /// Comma-separated run ids
    pub run_ids: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

async fn ok_json<T: Serialize + Sync>(data: &T, headers: &HeaderMap) -> Response<Body> {
    match json_response(StatusCode::OK, data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn upstream_error(context: &str, e: anyhow::Error) -> Response<Body> {
    tracing::error!("Error fetching {}: {:#}", context, e);
    error_response(StatusCode::BAD_GATEWAY, "Repository", format!("{:#}", e)).await
}

fn service_error_status(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::InvalidSelection(_) | ServiceError::Chart(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Repository(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn service_error(e: ServiceError) -> Response<Body> {
    let status = service_error_status(&e);
    if status.is_server_error() {
        tracing::error!("Chart request failed: {}", e);
    } else {
        tracing::debug!("Chart request rejected: {}", e);
    }
    error_response(status, e.kind(), e.to_string()).await
}

async fn chart_error(e: ChartError) -> Response<Body> {
    tracing::debug!("Chart build rejected: {}", e);
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e.kind(), e.to_string()).await
}

/// Malformed or mistyped request bodies get the same `{error, message}` shape as other failures
async fn rejected_body(rejection: JsonRejection) -> Response<Body> {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    error_response(rejection.status(), "InvalidRequest", rejection.body_text()).await
}

/// List all experiments
pub async fn list_experiments(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.chart_service.list_experiments().await {
        Ok(experiments) => ok_json(&experiments, &headers).await,
        Err(e) => upstream_error("experiments", e).await,
    }
}

/// List runs, optionally for one experiment
pub async fn list_runs(
    Query(query): Query<RunsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.chart_service.list_runs(query.experiment_id.as_deref()).await {
        Ok(runs) => ok_json(&runs, &headers).await,
        Err(e) => upstream_error("runs", e).await,
    }
}

/// Metrics recorded for the given runs
pub async fn available_metrics(
    Query(query): Query<MetricsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let run_ids: Vec<String> = query
        .run_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    match state.chart_service.available_metrics(&run_ids).await {
        Ok(metrics) => ok_json(&metrics, &headers).await,
        Err(e) => upstream_error("available metrics", e).await,
    }
}

/// Build a chart from caller-supplied runs (no metrics store access)
pub async fn build_chart_model(
    headers: HeaderMap,
    body: Result<Json<ChartRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection).await,
    };
    match build_chart(&request) {
        Ok(model) => ok_json(&model, &headers).await,
        Err(e) => chart_error(e).await,
    }
}

/// Fetch the selected runs and build one chart
pub async fn query_chart(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChartSelection>, JsonRejection>,
) -> impl IntoResponse {
    let Json(selection) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection).await,
    };
    match state.chart_service.build_chart(&selection).await {
        Ok(model) => ok_json(&model, &headers).await,
        Err(e) => service_error(e).await,
    }
}

/// Stream one chart panel per selected metric (progressive loading)
pub async fn stream_panels(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChartSelection>, JsonRejection>,
) -> Response<Body> {
    let Json(selection) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection).await,
    };
    let compress = accepts_brotli(&headers);
    let rx = state.streaming_service.stream_panels(selection).await;
    stream_from_receiver(rx, compress).await.into_response()
}
