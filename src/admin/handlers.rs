use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::registry::{
    Backend, BackendStatus, BackendUpdate, FleetStats, FluctuationReport, RegionStats,
};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub generation: u64,
    pub backends: usize,
    pub uptime_secs: u64,
    pub fluctuation_enabled: bool,
}

/// Body of `POST /admin/backends/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBackendBody {
    pub status: Option<String>,
    pub load: Option<f64>,
}

/// Body of `PUT /admin/latency`.
#[derive(Debug, Deserialize)]
pub struct LatencyUpdate {
    pub from: String,
    pub to: String,
    pub ms: f64,
}

#[derive(Serialize)]
pub struct LatencyUpdated {
    pub from: String,
    pub to: String,
    pub ms: f64,
    /// Latency now reported for `from → to`.
    pub effective_ms: f64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.engine.registry().snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        generation: snapshot.generation(),
        backends: snapshot.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        fluctuation_enabled: state.fluctuation.enabled,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<FleetStats> {
    let snapshot = state.engine.registry().snapshot();
    Json(FleetStats::from_snapshot(&snapshot))
}

pub async fn get_region_stats(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, RegionStats>> {
    let snapshot = state.engine.registry().snapshot();
    Json(RegionStats::by_region(&snapshot))
}

pub async fn update_backend(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateBackendBody>, JsonRejection>,
) -> Result<Json<Backend>, ApiError> {
    let Json(body) = body?;
    let status = body
        .status
        .as_deref()
        .map(str::parse::<BackendStatus>)
        .transpose()?;
    let update = BackendUpdate {
        status,
        load: body.load,
    };
    Ok(Json(state.engine.registry().update_backend(&id, update)?))
}

pub async fn fluctuate(State(state): State<AppState>) -> Json<FluctuationReport> {
    let mut rng = StdRng::from_entropy();
    let report = state
        .engine
        .registry()
        .apply_fluctuation(&state.simulator, &mut rng);
    tracing::info!(
        changed = report.changed(),
        generation = report.generation,
        "Manual fluctuation applied"
    );
    Json(report)
}

pub async fn update_latency(
    State(state): State<AppState>,
    body: Result<Json<LatencyUpdate>, JsonRejection>,
) -> Result<Json<LatencyUpdated>, ApiError> {
    let Json(body) = body?;
    state.engine.update_latency(&body.from, &body.to, body.ms)?;
    let effective_ms = state
        .engine
        .settings()
        .latency
        .network_latency(&body.from, &body.to);
    Ok(Json(LatencyUpdated {
        from: body.from,
        to: body.to,
        ms: body.ms,
        effective_ms,
    }))
}
