//! painel-server library - assessment results dashboard
//!
//! Authenticates municipal and school users, queries the upstream
//! analytics API for the selected subject and grade across the three
//! assessment cycles, and serves the normalized tables and summaries as
//! JSON.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use painel_common::config::AppConfig;

pub mod api;
pub mod error;
pub mod services;
pub mod session;

use services::{DashboardLoader, ResultsTransport};
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub loader: Arc<DashboardLoader>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Create application state around a results transport
    pub fn new(config: AppConfig, transport: Arc<dyn ResultsTransport>) -> Self {
        let loader = DashboardLoader::from_config(&config, transport);
        let sessions = SessionStore::new(config.session.idle_timeout);
        Self {
            config: Arc::new(config),
            loader: Arc::new(loader),
            sessions,
        }
    }
}

/// Build application router
///
/// Health, build info, options and login are public. Everything that
/// reads or ends a session goes through [`api::require_session`].
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/session", get(api::current_session))
        .route("/api/logout", post(api::logout))
        .route("/api/results", get(api::get_results))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_session,
        ));

    let public = Router::new()
        .route("/api/login", post(api::login))
        .route("/api/options", get(api::get_options))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
