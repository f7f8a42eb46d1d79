//! Selector options

use axum::Json;
use serde::Serialize;

use painel_common::{Cycle, Grade, Subject};

#[derive(Debug, Serialize)]
pub struct GradeOption {
    pub valor: u8,
    pub rotulo: String,
}

#[derive(Debug, Serialize)]
pub struct CycleOption {
    pub chave: &'static str,
    pub rotulo: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub etapas: Vec<GradeOption>,
    pub componentes: Vec<&'static str>,
    pub ciclos: Vec<CycleOption>,
}

/// GET /api/options
pub async fn get_options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        etapas: Grade::all()
            .map(|grade| GradeOption {
                valor: grade.value(),
                rotulo: format!("{} do Ensino Fundamental", grade),
            })
            .collect(),
        componentes: Subject::ALL.iter().map(Subject::label).collect(),
        ciclos: Cycle::ALL
            .iter()
            .map(|cycle| CycleOption {
                chave: cycle.key(),
                rotulo: cycle.label(),
            })
            .collect(),
    })
}
