//! Read-side dashboard API.
//!
//! Thin JSON boundary over the engine's query surface; all state lives in
//! the engine. Consumed by the reporting dashboard, never by adapters.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::Engine;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub runtime: String,
    pub total_offers: usize,
    pub matches_found: u64,
    pub active_arbitrages: usize,
    pub collection_rate: f64,
    pub platform_breakdown: Vec<(String, u64)>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub path: String,
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/stats", get(detailed_stats))
        .route("/api/opportunities", get(opportunities))
        .route("/api/recent", get(recent))
        .route("/api/hourly", get(hourly_summary))
        .route("/api/snapshot", post(snapshot))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(engine): State<Arc<Engine>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        runtime: engine.runtime(),
        total_offers: engine.size(),
        matches_found: engine.matches_found(),
        active_arbitrages: engine.arbitrage_count(),
        collection_rate: engine.collection_rate(),
        platform_breakdown: engine.platform_breakdown(),
    })
}

async fn detailed_stats(State(engine): State<Arc<Engine>>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(engine.detailed_stats()).unwrap_or_default())
}

async fn opportunities(State(engine): State<Arc<Engine>>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(engine.active_opportunities()).unwrap_or_default())
}

async fn recent(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<RecentQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(10);
    Json(serde_json::to_value(engine.recent_offers(limit)).unwrap_or_default())
}

async fn hourly_summary(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<SummaryQuery>,
) -> Json<serde_json::Value> {
    let hours = params.hours.unwrap_or(24);
    Json(serde_json::to_value(engine.hourly_summary(hours)).unwrap_or_default())
}

async fn snapshot(
    State(engine): State<Arc<Engine>>,
) -> Result<Json<SnapshotResponse>, StatusCode> {
    match engine.save_snapshot(None) {
        Ok(path) => Ok(Json(SnapshotResponse {
            path: path.display().to_string(),
        })),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
