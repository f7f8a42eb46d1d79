//! Dashboard results endpoint

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use painel_common::{EntityCode, Grade, Subject};

use crate::error::ApiResult;
use crate::services::{Dashboard, NO_DATA_MESSAGE};
use crate::session::SessionContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    /// Subject display label, e.g. `Matemática`
    pub componente: String,
    pub etapa: u8,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub codigo: EntityCode,
    pub componente: Subject,
    pub etapa: Grade,
    #[serde(flatten)]
    pub dashboard: Dashboard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensagem: Option<&'static str>,
}

/// GET /api/results?componente=...&etapa=...
///
/// Entity comes from the session, never from the query string.
pub async fn get_results(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<ResultsResponse>> {
    let subject: Subject = query.componente.parse()?;
    let grade = Grade::new(query.etapa)?;

    let dashboard = state.loader.load(&session.entity, subject, grade).await;
    let mensagem = dashboard.is_empty().then_some(NO_DATA_MESSAGE);

    Ok(Json(ResultsResponse {
        codigo: session.entity,
        componente: subject,
        etapa: grade,
        dashboard,
        mensagem,
    }))
}
