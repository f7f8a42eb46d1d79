//! Liveness endpoint for load balancers and uptime checks

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Open logins, idle ones not yet swept included
    pub sessoes: usize,
    /// Upstream responses held in the results cache
    pub respostas_em_cache: usize,
}

/// GET /health, answered without a login token
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "painel-server",
        version: env!("CARGO_PKG_VERSION"),
        sessoes: state.sessions.len().await,
        respostas_em_cache: state.loader.gateway().cache().len().await,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
