//! Public API handlers.
//!
//! Thin wrappers: decode JSON, call the engine or registry, encode JSON.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::RegionConfig;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::registry::Backend;
use crate::routing::{
    BatchRouting, InferenceRequest, Recommendation, RecommendationQuery, RouteRequest,
    RoutingResult,
};

/// Largest accepted batch.
pub const MAX_BATCH: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct BatchRouteRequest {
    pub requests: Vec<RouteRequest>,
}

/// Backend as listed by the API, with its derived queue time.
#[derive(Debug, Serialize)]
pub struct BackendView {
    #[serde(flatten)]
    pub backend: Backend,
    pub estimated_queue_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct LatencyMap {
    pub default_ms: f64,
    pub same_region_ms: f64,
    pub pairs: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backends: usize,
}

pub async fn route(
    State(state): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    let Json(body) = body?;
    let request = body.into_request()?;
    Ok(Json(state.engine.route(&request)))
}

pub async fn route_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchRouteRequest>, JsonRejection>,
) -> Result<Json<BatchRouting>, ApiError> {
    let Json(body) = body?;
    if body.requests.len() > MAX_BATCH {
        return Err(ApiError::BatchTooLarge(body.requests.len(), MAX_BATCH));
    }

    let requests = body
        .requests
        .into_iter()
        .enumerate()
        .map(|(index, r)| r.into_request().map_err(|source| ApiError::BatchItem { index, source }))
        .collect::<Result<Vec<InferenceRequest>, ApiError>>()?;

    Ok(Json(state.engine.route_batch(&requests)))
}

pub async fn recommend(
    State(state): State<AppState>,
    query: Result<Json<RecommendationQuery>, JsonRejection>,
) -> Result<Json<Recommendation>, ApiError> {
    let Json(query) = query?;
    Ok(Json(state.engine.recommend(query)?))
}

pub async fn list_backends(State(state): State<AppState>) -> Json<Vec<BackendView>> {
    let settings = state.engine.settings();
    let views = state
        .engine
        .registry()
        .list()
        .into_iter()
        .map(|backend| BackendView {
            estimated_queue_time_ms: settings.latency.queue_time(&backend),
            backend,
        })
        .collect();
    Json(views)
}

pub async fn latency_map(State(state): State<AppState>) -> Json<LatencyMap> {
    let settings = state.engine.settings();
    let table = settings.latency.table();
    Json(LatencyMap {
        default_ms: table.default_ms(),
        same_region_ms: 0.0,
        pairs: table.as_map(),
    })
}

pub async fn regions(State(state): State<AppState>) -> Json<Vec<RegionConfig>> {
    Json(state.regions.as_ref().clone())
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backends: state.engine.registry().len(),
    })
}
