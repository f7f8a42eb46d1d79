//! Business logic services

pub mod dashboard_loader;
pub mod gateway_client;
pub mod normalizer;
pub mod query_builder;
pub mod response_cache;
pub mod summary;

pub use dashboard_loader::{Dashboard, DashboardLoader, QueryOutcome, QueryStatus, NO_DATA_MESSAGE};
pub use gateway_client::{FetchError, GatewayClient, HttpTransport, ResultsTransport};
pub use normalizer::{normalize, ResultRow, ResultTable};
pub use query_builder::{QueryBuilder, QueryDocument, QueryKind};
pub use response_cache::ResponseCache;
pub use summary::{summarize, Summary};
