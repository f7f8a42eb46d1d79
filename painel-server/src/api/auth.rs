//! Login, logout and session middleware
//!
//! Login checks the credential store and opens a session. Protected routes
//! carry `Authorization: Bearer <token>`; the middleware resolves the token
//! to its [`SessionContext`] and hands it to handlers through request
//! extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use painel_common::{EntityCode, EntityKind};

use crate::error::{ApiError, ApiResult};
use crate::session::SessionContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub codigo: String,
    pub senha: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub codigo: EntityCode,
    pub tipo: EntityKind,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let config = &state.config;

    if !config.credentials.verify(&request.codigo, &request.senha) {
        warn!(codigo = %request.codigo.trim(), "Login rejected");
        return Err(ApiError::Unauthorized("Código ou senha inválidos.".to_string()));
    }

    let entity = EntityCode::new(&request.codigo)?;
    let kind = config.network.classify(&entity, &config.credentials);
    let session = state.sessions.open(entity, kind).await;
    let sessoes = state.sessions.len().await;

    info!(
        codigo = %session.entity,
        tipo = kind.label(),
        sessoes,
        "Login succeeded"
    );

    Ok(Json(LoginResponse {
        token: session.token,
        codigo: session.entity,
        tipo: session.kind,
    }))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> StatusCode {
    state.sessions.close(&session.token).await;
    info!(codigo = %session.entity, "Logged out");
    StatusCode::NO_CONTENT
}

/// GET /api/session
pub async fn current_session(Extension(session): Extension<SessionContext>) -> Json<SessionContext> {
    Json(session)
}

/// Session middleware for protected routes
///
/// Returns 401 when the bearer token is missing, malformed or not open.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing or invalid bearer token".to_string()))?;

    let session = state
        .sessions
        .get(&token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".to_string()))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<Uuid> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}
