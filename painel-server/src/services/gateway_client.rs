//! Upstream results API client
//!
//! One POST endpoint, JSON in and out, bounded total timeout. Responses are
//! cached by exact document content for the configured TTL. Failures are
//! reported as a [`FetchError`] category and never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::query_builder::QueryDocument;
use super::response_cache::ResponseCache;

/// Upstream fetch failure categories
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("Request failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Stable category name for logs and API responses
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Other(e.to_string())
        }
    }
}

/// Sends a query document upstream and returns the raw JSON response
#[async_trait]
pub trait ResultsTransport: Send + Sync {
    async fn post(&self, document: &QueryDocument) -> Result<Value, FetchError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    http_client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Other(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ResultsTransport for HttpTransport {
    async fn post(&self, document: &QueryDocument) -> Result<Value, FetchError> {
        debug!(url = %self.url, entity = %document.entity, "Querying results API");

        let response = self
            .http_client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Cached access to the results API
pub struct GatewayClient {
    transport: Arc<dyn ResultsTransport>,
    cache: ResponseCache,
}

impl GatewayClient {
    pub fn new(transport: Arc<dyn ResultsTransport>, cache: ResponseCache) -> Self {
        Self { transport, cache }
    }

    /// Fetch the response for `document`, from cache when fresh
    ///
    /// Only successful responses are cached; a failed query is attempted
    /// again on the next call.
    pub async fn fetch(&self, document: &QueryDocument) -> Result<Value, FetchError> {
        let key = ResponseCache::key_for(document).map_err(|e| FetchError::Other(e.to_string()))?;

        if let Some(cached) = self.cache.get(&key).await {
            debug!(entity = %document.entity, "Results cache hit");
            return Ok(cached);
        }

        debug!(entity = %document.entity, "Results cache miss");
        let response = self.transport.post(document).await?;
        self.cache.insert(key, response.clone()).await;
        let entries = self.cache.len().await;
        debug!(entries, "Results cached");
        Ok(response)
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query_builder::{Filter, SortDirection};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that counts calls and fails on demand
    struct CountingTransport {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
    }

    impl CountingTransport {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(fail_first),
            }
        }
    }

    #[async_trait]
    impl ResultsTransport for CountingTransport {
        async fn post(&self, document: &QueryDocument) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(FetchError::Timeout);
            }
            Ok(json!({"result": [{"NM_ENTIDADE": document.entity}]}))
        }
    }

    fn document(session_token: &str) -> QueryDocument {
        QueryDocument {
            indicators: vec!["TX_ACERTOS".to_string()],
            entity: "2301".to_string(),
            filters: vec![Filter::equal_to("DADOS.VL_FILTRO_AVALIACAO", "AV12025")],
            additional_filters: vec![Filter::equal_to("DADOS.VL_FILTRO_REDE", "MUNICIPAL")],
            ordering: vec![("NM_ENTIDADE".to_string(), SortDirection::Asc)],
            level_below: "0".to_string(),
            result_collection: None,
            indicator_labels: Vec::new(),
            entity_type_label: "01".to_string(),
            application_id: "portal".to_string(),
            client_version: "js2.19.0".to_string(),
            installation_id: "install".to_string(),
            session_token: session_token.to_string(),
        }
    }

    fn client(transport: Arc<CountingTransport>) -> GatewayClient {
        GatewayClient::new(transport, ResponseCache::new(Duration::from_secs(300)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_documents_within_ttl_hit_network_once() {
        let transport = Arc::new(CountingTransport::new(0));
        let gateway = client(transport.clone());

        let first = gateway.fetch(&document("t")).await.unwrap();
        tokio::time::advance(Duration::from_secs(120)).await;
        let second = gateway.fetch(&document("t")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_triggers_new_call() {
        let transport = Arc::new(CountingTransport::new(0));
        let gateway = client(transport.clone());

        gateway.fetch(&document("t")).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        gateway.fetch(&document("t")).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_key_includes_pass_through_credentials() {
        let transport = Arc::new(CountingTransport::new(0));
        let gateway = client(transport.clone());

        gateway.fetch(&document("token-a")).await.unwrap();
        gateway.fetch(&document("token-b")).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let transport = Arc::new(CountingTransport::new(1));
        let gateway = client(transport.clone());

        assert_eq!(gateway.fetch(&document("t")).await, Err(FetchError::Timeout));
        assert!(gateway.fetch(&document("t")).await.is_ok());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(FetchError::Timeout.category(), "timeout");
        assert_eq!(FetchError::Connection("x".into()).category(), "connection");
        assert_eq!(FetchError::HttpStatus(502).category(), "http_status");
        assert_eq!(FetchError::Other("x".into()).category(), "other");
        assert_eq!(FetchError::HttpStatus(502).to_string(), "HTTP error 502");
    }
}
