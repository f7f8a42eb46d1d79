//! Shared fixtures for painel-server integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use painel_common::config::{AppConfig, TomlConfig};
use painel_server::services::query_builder::ASSESSMENT_FIELD;
use painel_server::services::{FetchError, QueryDocument, QueryKind, ResultsTransport};

pub const MUNICIPAL_CODE: &str = "2301";
pub const MUNICIPAL_PASSWORD: &str = "muni-pw";
pub const SCHOOL_CODE: &str = "23000291";
pub const SCHOOL_PASSWORD: &str = "school-pw";
pub const MASTER_PASSWORD: &str = "master-pw";

/// Configuration pointing at `url` with fixed credentials and a 60 s session idle timeout
pub fn config_with_url(url: &str) -> AppConfig {
    let text = format!(
        r#"
[api]
url = "{url}"
timeout_secs = 2
installation_id = "install-1"
session_token = "r:token-1"

[indicators]
general = ["TX_ACERTOS", "TX_PARTICIPACAO", "QT_PREVISTO", "QT_EFETIVO", "NU_N01", "NU_N02", "NU_N03"]
skills = ["TX_ACERTO"]

[session]
idle_timeout_secs = 60

[users]
"{MUNICIPAL_CODE}" = "{MUNICIPAL_PASSWORD}"

[schools]
"{SCHOOL_CODE}" = "{SCHOOL_PASSWORD}"

[master]
senha_mestra = "{MASTER_PASSWORD}"
"#
    );
    let raw: TomlConfig = toml::from_str(&text).expect("test config should parse");
    AppConfig::from_toml(raw).expect("test config should validate")
}

pub fn test_config() -> AppConfig {
    config_with_url("http://127.0.0.1:9/results")
}

/// Which query a document is: assessment code plus kind
pub fn query_key(document: &QueryDocument) -> (String, QueryKind) {
    let assessment = document.filter_value(ASSESSMENT_FIELD).unwrap_or_default().to_string();
    let kind = if document.containment_filters().next().is_some() {
        QueryKind::Skills
    } else {
        QueryKind::General
    };
    (assessment, kind)
}

/// In-memory transport with scripted responses per (assessment, kind)
///
/// Unscripted queries answer with an empty `result` array.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<(String, QueryKind), Result<Value, FetchError>>>,
    documents: Mutex<Vec<QueryDocument>>,
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, assessment: &str, kind: QueryKind, response: Result<Value, FetchError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((assessment.to_string(), kind), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> Vec<QueryDocument> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultsTransport for StubTransport {
    async fn post(&self, document: &QueryDocument) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().push(document.clone());
        self.responses
            .lock()
            .unwrap()
            .get(&query_key(document))
            .cloned()
            .unwrap_or_else(|| Ok(json!({ "result": [] })))
    }
}

/// Single general row as the upstream API returns it
pub fn general_response(hit_rate: &str) -> Value {
    json!({
        "result": [{
            "NM_ENTIDADE": "ESCOLA TESTE",
            "VL_FILTRO_ETAPA": "ENSINO FUNDAMENTAL DE 9 ANOS - 3º ANO",
            "TX_ACERTOS": hit_rate,
            "TX_PARTICIPACAO": "92.0",
            "QT_PREVISTO": 40,
            "QT_EFETIVO": "37",
            "NU_N01": 5,
            "NU_N02": 12,
            "NU_N03": 20
        }]
    })
}

pub fn skills_response() -> Value {
    json!({
        "result": [
            {"CD_HABILIDADE": "D01", "DC_HABILIDADE": "Contar", "TX_ACERTO": "81.26"},
            {"CD_HABILIDADE": "D02", "DC_HABILIDADE": "Somar", "TX_ACERTO": 44.0},
            {"CD_HABILIDADE": "D03", "DC_HABILIDADE": "Medir", "TX_ACERTO": "n/a"}
        ]
    })
}
