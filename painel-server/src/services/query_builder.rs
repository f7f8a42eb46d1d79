//! Query documents for the upstream results API
//!
//! Builds the JSON filter document `getDadosResultado` expects for one
//! entity, subject, grade and cycle. Two kinds exist: the general query
//! (participation, hit rate, learning levels) and the skills query (hit rate
//! per skill, restricted to the four proficiency bands).
//!
//! Field names below are the upstream wire contract and must not change.

use serde::{Deserialize, Serialize};

use painel_common::config::{AppConfig, IndicatorLists, NetworkPolicy};
use painel_common::{AssessmentSelection, CredentialStore};

pub const SUBJECT_FIELD: &str = "DADOS.VL_FILTRO_DISCIPLINA";
pub const STAGE_FIELD: &str = "DADOS.VL_FILTRO_ETAPA";
pub const ASSESSMENT_FIELD: &str = "DADOS.VL_FILTRO_AVALIACAO";
pub const NETWORK_FIELD: &str = "DADOS.VL_FILTRO_REDE";
pub const SKILL_BAND_FIELD: &str = "DADOS.DC_FAIXA_PERCENTUAL_HABILIDADE";
pub const SKILL_CODE_SORT: &str = "DADOS.CD_HABILIDADE";
pub const ENTITY_NAME_SORT: &str = "NM_ENTIDADE";

pub const APPLICATION_ID: &str = "portal";
pub const ENTITY_TYPE_LABEL: &str = "01";
pub const LEVEL_BELOW: &str = "0";

/// Proficiency bands the skills query is restricted to
pub const SKILL_BANDS: [&str; 4] = ["Alto", "Médio Baixo", "Médio Alto", "Baixo"];

/// Which of the two upstream queries to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    #[serde(rename = "geral")]
    General,
    #[serde(rename = "habilidades")]
    Skills,
}

impl QueryKind {
    pub const ALL: [QueryKind; 2] = [QueryKind::General, QueryKind::Skills];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::General => "geral",
            QueryKind::Skills => "habilidades",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperation {
    #[serde(rename = "equalTo")]
    EqualTo,
    #[serde(rename = "containedIn")]
    ContainedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
}

/// One `{operation, field, value}` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub operation: FilterOperation,
    pub field: String,
    pub value: FilterValue,
}

impl Filter {
    pub fn equal_to(field: &str, value: impl Into<String>) -> Self {
        Self {
            operation: FilterOperation::EqualTo,
            field: field.to_string(),
            value: FilterValue::Text(value.into()),
        }
    }

    pub fn contained_in(field: &str, values: &[&str]) -> Self {
        Self {
            operation: FilterOperation::ContainedIn,
            field: field.to_string(),
            value: FilterValue::List(values.iter().map(|v| v.to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Request body of `getDadosResultado`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDocument {
    #[serde(rename = "CD_INDICADOR")]
    pub indicators: Vec<String>,
    #[serde(rename = "agregado")]
    pub entity: String,
    #[serde(rename = "filtros")]
    pub filters: Vec<Filter>,
    #[serde(rename = "filtrosAdicionais")]
    pub additional_filters: Vec<Filter>,
    /// Serialized as `[field, direction]` pairs
    #[serde(rename = "ordenacao")]
    pub ordering: Vec<(String, SortDirection)>,
    #[serde(rename = "nivelAbaixo")]
    pub level_below: String,
    #[serde(rename = "collectionResultado")]
    pub result_collection: Option<String>,
    #[serde(rename = "CD_INDICADOR_LABEL")]
    pub indicator_labels: Vec<String>,
    #[serde(rename = "TP_ENTIDADE_LABEL")]
    pub entity_type_label: String,
    #[serde(rename = "_ApplicationId")]
    pub application_id: String,
    #[serde(rename = "_ClientVersion")]
    pub client_version: String,
    #[serde(rename = "_InstallationId")]
    pub installation_id: String,
    #[serde(rename = "_SessionToken")]
    pub session_token: String,
}

impl QueryDocument {
    /// Filters with the `containedIn` operation
    pub fn containment_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters
            .iter()
            .filter(|f| f.operation == FilterOperation::ContainedIn)
    }

    /// Value of the first `equalTo` filter on `field`
    pub fn filter_value(&self, field: &str) -> Option<&str> {
        self.filters
            .iter()
            .chain(self.additional_filters.iter())
            .find(|f| f.field == field && f.operation == FilterOperation::EqualTo)
            .and_then(|f| match &f.value {
                FilterValue::Text(text) => Some(text.as_str()),
                FilterValue::List(_) => None,
            })
    }
}

/// Builds query documents from validated selections
///
/// Holds the deployment-wide pieces (indicator lists, network policy,
/// pass-through credentials); everything else comes from the selection.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    indicators: IndicatorLists,
    network: NetworkPolicy,
    credentials: CredentialStore,
    client_version: String,
    assessment_year: u16,
    installation_id: String,
    session_token: String,
}

impl QueryBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            indicators: config.indicators.clone(),
            network: config.network.clone(),
            credentials: config.credentials.clone(),
            client_version: config.api.client_version.clone(),
            assessment_year: config.api.assessment_year,
            installation_id: config.api.installation_id.clone(),
            session_token: config.api.session_token.clone(),
        }
    }

    pub fn build(&self, selection: &AssessmentSelection, kind: QueryKind) -> QueryDocument {
        let network = self
            .network
            .network_for(selection.entity(), &self.credentials);

        let mut filters = vec![
            Filter::equal_to(SUBJECT_FIELD, selection.subject().canonical_label()),
            Filter::equal_to(STAGE_FIELD, selection.grade().stage_label()),
            Filter::equal_to(
                ASSESSMENT_FIELD,
                selection.cycle().assessment_code(self.assessment_year),
            ),
        ];

        let (indicators, sort_field) = match kind {
            QueryKind::General => (&self.indicators.general, ENTITY_NAME_SORT),
            QueryKind::Skills => {
                filters.push(Filter::contained_in(SKILL_BAND_FIELD, &SKILL_BANDS));
                (&self.indicators.skills, SKILL_CODE_SORT)
            }
        };

        QueryDocument {
            indicators: indicators.clone(),
            entity: selection.entity().as_str().to_string(),
            filters,
            additional_filters: vec![Filter::equal_to(NETWORK_FIELD, network.filter_value())],
            ordering: vec![(sort_field.to_string(), SortDirection::Asc)],
            level_below: LEVEL_BELOW.to_string(),
            result_collection: None,
            indicator_labels: Vec::new(),
            entity_type_label: ENTITY_TYPE_LABEL.to_string(),
            application_id: APPLICATION_ID.to_string(),
            client_version: self.client_version.clone(),
            installation_id: self.installation_id.clone(),
            session_token: self.session_token.clone(),
        }
    }
}
