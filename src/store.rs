use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::record::VisitorRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store is not configured")]
    NotConfigured,

    #[error("credential acquisition failed: {0}")]
    Credential(String),

    #[error("store request failed: {0}")]
    Request(String),

    #[error("store returned HTTP {0}")]
    Status(StatusCode),
}

/// Opaque credential acquisition for the document store. The concrete
/// mechanism (managed identity, pre-issued token) is the provider's
/// business; the store only ever asks for a token.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self) -> Result<String, StoreError>;
}

/// Serves a pre-issued token from configuration. A missing token surfaces
/// at call time as a credential error, which the pipeline recovers like
/// any other store failure.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<String, StoreError> {
        self.token
            .clone()
            .ok_or_else(|| StoreError::Credential("no store token configured".to_string()))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record, partitioned by its IP address.
    async fn save(&self, record: &VisitorRecord) -> Result<(), StoreError>;

    /// Read back all records for one partition key, for diagnostics.
    async fn fetch_by_ip(&self, ip: &str) -> Result<Vec<VisitorRecord>, StoreError>;

    /// Lightweight connectivity probe. Probe errors recover to `false`.
    async fn health_check(&self) -> bool;
}

const PARTITION_KEY_HEADER: &str = "x-ms-documentdb-partitionkey";
const IS_QUERY_HEADER: &str = "x-ms-documentdb-isquery";
const QUERY_CONTENT_TYPE: &str = "application/query+json";

/// REST client for the document store. Documents live under
/// `{endpoint}/dbs/{database}/colls/{container}/docs`, partitioned by
/// `ip_address`.
pub struct DocumentStore {
    endpoint: String,
    database: String,
    container: String,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
}

impl DocumentStore {
    pub fn new(
        endpoint: String,
        database: String,
        container: String,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            database,
            container,
            credentials,
            client,
        })
    }

    fn docs_url(&self) -> String {
        format!(
            "{}/dbs/{}/colls/{}/docs",
            self.endpoint, self.database, self.container
        )
    }

    fn database_url(&self) -> String {
        format!("{}/dbs/{}", self.endpoint, self.database)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents")]
    documents: Vec<VisitorRecord>,
}

#[async_trait]
impl RecordStore for DocumentStore {
    async fn save(&self, record: &VisitorRecord) -> Result<(), StoreError> {
        let token = self.credentials.get_token().await?;

        let response = self
            .client
            .post(self.docs_url())
            .bearer_auth(token)
            .header(
                PARTITION_KEY_HEADER,
                format!("[\"{}\"]", record.ip_address),
            )
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The store keeps the first document written under a given id.
        if status == StatusCode::CONFLICT {
            warn!("Document {} already exists", record.id);
            return Ok(());
        }

        Err(StoreError::Status(status))
    }

    async fn fetch_by_ip(&self, ip: &str) -> Result<Vec<VisitorRecord>, StoreError> {
        let token = self.credentials.get_token().await?;

        let query = json!({
            "query": "SELECT * FROM c WHERE c.ip_address = @ip",
            "parameters": [{"name": "@ip", "value": ip}],
        });

        let response = self
            .client
            .post(self.docs_url())
            .bearer_auth(token)
            .header(IS_QUERY_HEADER, "true")
            .header(reqwest::header::CONTENT_TYPE, QUERY_CONTENT_TYPE)
            .header(PARTITION_KEY_HEADER, format!("[\"{ip}\"]"))
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }

        let body = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(body.documents)
    }

    async fn health_check(&self) -> bool {
        let token = match self.credentials.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Store health probe skipped: {e}");
                return false;
            }
        };

        match self
            .client
            .get(self.database_url())
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Store health probe failed: {e}");
                false
            }
        }
    }
}

/// Stand-in for deployments without a configured endpoint. Saves fail and
/// are recovered upstream; the health probe reports unreachable.
pub struct UnconfiguredStore;

#[async_trait]
impl RecordStore for UnconfiguredStore {
    async fn save(&self, _record: &VisitorRecord) -> Result<(), StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn fetch_by_ip(&self, _ip: &str) -> Result<Vec<VisitorRecord>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn health_check(&self) -> bool {
        false
    }
}
