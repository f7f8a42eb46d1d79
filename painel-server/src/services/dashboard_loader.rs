//! Dashboard data loading
//!
//! One dashboard view needs every cycle of both query kinds: six independent
//! upstream queries. They run concurrently and are joined before the tables
//! are concatenated per kind. A failed or empty query only removes its own
//! table; the others are still returned.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use painel_common::config::AppConfig;
use painel_common::{AssessmentSelection, Cycle, EntityCode, Grade, Subject};

use super::gateway_client::{GatewayClient, ResultsTransport};
use super::normalizer::{normalize, ResultRow};
use super::query_builder::{QueryBuilder, QueryKind};
use super::response_cache::ResponseCache;
use super::summary::{summarize, Summary};

/// User-facing message when no query returned data
pub const NO_DATA_MESSAGE: &str = "Não foram encontrados dados para os filtros selecionados. \
     Verifique se a entidade possui dados disponíveis para a etapa e componente escolhidos.";

/// How one (cycle, kind) query ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    Loaded { rows: usize },
    NoData,
    Failed { category: &'static str, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub ciclo: &'static str,
    pub tipo: QueryKind,
    #[serde(flatten)]
    pub status: QueryStatus,
}

/// Everything one dashboard view displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub geral: Vec<ResultRow>,
    pub habilidades: Vec<ResultRow>,
    pub consultas: Vec<QueryOutcome>,
    pub resumo: Summary,
}

impl Dashboard {
    pub fn is_empty(&self) -> bool {
        self.geral.is_empty() && self.habilidades.is_empty()
    }

    pub fn failed_queries(&self) -> usize {
        self.consultas
            .iter()
            .filter(|o| matches!(o.status, QueryStatus::Failed { .. }))
            .count()
    }
}

/// Builds, fetches and normalizes the six queries of a dashboard view
pub struct DashboardLoader {
    builder: QueryBuilder,
    gateway: GatewayClient,
}

impl DashboardLoader {
    pub fn new(builder: QueryBuilder, gateway: GatewayClient) -> Self {
        Self { builder, gateway }
    }

    /// Loader wired from configuration around the given transport
    pub fn from_config(config: &AppConfig, transport: Arc<dyn ResultsTransport>) -> Self {
        Self::new(
            QueryBuilder::new(config),
            GatewayClient::new(transport, ResponseCache::new(config.api.cache_ttl)),
        )
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    pub async fn load(&self, entity: &EntityCode, subject: Subject, grade: Grade) -> Dashboard {
        let queries: Vec<(Cycle, QueryKind)> = Cycle::ALL
            .into_iter()
            .flat_map(|cycle| QueryKind::ALL.into_iter().map(move |kind| (cycle, kind)))
            .collect();

        let fetches = queries.iter().map(|&(cycle, kind)| {
            let selection = AssessmentSelection::new(entity.clone(), subject, grade, cycle);
            let document = self.builder.build(&selection, kind);
            async move { (cycle, kind, self.gateway.fetch(&document).await) }
        });

        let mut dashboard = Dashboard {
            geral: Vec::new(),
            habilidades: Vec::new(),
            consultas: Vec::with_capacity(queries.len()),
            resumo: Summary::default(),
        };

        for (cycle, kind, result) in join_all(fetches).await {
            let status = match result {
                Ok(response) => match normalize(&response, cycle, kind) {
                    Some(table) => {
                        let rows = table.rows.len();
                        match kind {
                            QueryKind::General => dashboard.geral.extend(table.rows),
                            QueryKind::Skills => dashboard.habilidades.extend(table.rows),
                        }
                        QueryStatus::Loaded { rows }
                    }
                    None => QueryStatus::NoData,
                },
                Err(e) => {
                    warn!(
                        entity = %entity,
                        cycle = cycle.key(),
                        kind = kind.as_str(),
                        category = e.category(),
                        error = %e,
                        "Results query failed"
                    );
                    QueryStatus::Failed {
                        category: e.category(),
                        error: e.to_string(),
                    }
                }
            };

            dashboard.consultas.push(QueryOutcome {
                ciclo: cycle.label(),
                tipo: kind,
                status,
            });
        }

        dashboard.resumo = summarize(&dashboard.geral, &dashboard.habilidades);

        info!(
            entity = %entity,
            subject = subject.label(),
            grade = grade.value(),
            general_rows = dashboard.geral.len(),
            skill_rows = dashboard.habilidades.len(),
            failed = dashboard.failed_queries(),
            "Dashboard loaded"
        );

        dashboard
    }
}
