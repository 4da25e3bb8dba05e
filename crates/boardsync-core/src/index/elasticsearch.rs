//! Elasticsearch backend over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::backend::IndexBackend;
use crate::config::SearchConfig;
use crate::error::{Error, Result};

/// Request timeout used when the configuration does not set one
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Elasticsearch client
#[derive(Clone)]
pub struct ElasticsearchClient {
    http_client: HttpClient,
    base_url: String,
    refresh: bool,
}

impl std::fmt::Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("base_url", &self.base_url)
            .field("refresh", &self.refresh)
            .finish()
    }
}

/// Builder for creating an ElasticsearchClient
#[derive(Debug, Default)]
pub struct ElasticsearchClientBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    refresh: bool,
}

impl ElasticsearchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster URL, e.g. `http://localhost:9200`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Ask the cluster to make each write visible to search before returning
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn build(self) -> Result<ElasticsearchClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigError("search.url is required".to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(ElasticsearchClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            refresh: self.refresh,
        })
    }
}

impl ElasticsearchClient {
    pub fn builder() -> ElasticsearchClientBuilder {
        ElasticsearchClientBuilder::new()
    }

    /// Build a client from the `[search]` configuration section
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let mut builder = Self::builder().base_url(config.resolved_url());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout_secs(secs);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn doc_url(&self, index: &str, doc_id: &str) -> String {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, doc_id);
        if self.refresh {
            format!("{}?refresh=wait_for", url)
        } else {
            url
        }
    }
}

#[async_trait]
impl IndexBackend for ElasticsearchClient {
    async fn upsert(&self, index: &str, doc_id: &str, doc: &Value) -> Result<()> {
        let write_error = |message: String| Error::IndexWrite {
            index: index.to_string(),
            message,
        };

        let response = self
            .http_client
            .put(self.doc_url(index, doc_id))
            .json(doc)
            .send()
            .await
            .map_err(|e| write_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(format!("HTTP {}: {}", status, body)));
        }

        debug!(index, doc_id, "Upserted document");
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<Value>> {
        let search_error = |message: String| Error::SearchExecution {
            index: index.to_string(),
            message,
        };

        let response = self
            .http_client
            .post(format!("{}/{}/_search", self.base_url, index))
            .json(body)
            .send()
            .await
            .map_err(|e| search_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(search_error(format!("HTTP {}: {}", status, text)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| search_error(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.base_url)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "Search cluster at {} answered HTTP {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_url() {
        assert!(matches!(
            ElasticsearchClient::builder().build(),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = ElasticsearchClient::builder()
            .base_url("http://localhost:9200/")
            .timeout_secs(5)
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9200");
        assert_eq!(client.doc_url("jobs", "job_1"), "http://localhost:9200/jobs/_doc/job_1");
    }

    #[test]
    fn test_refresh_flag_in_doc_url() {
        let client = ElasticsearchClient::builder()
            .base_url("http://es:9200")
            .refresh(true)
            .build()
            .unwrap();
        assert_eq!(
            client.doc_url("jobs", "job_1"),
            "http://es:9200/jobs/_doc/job_1?refresh=wait_for"
        );
    }

    #[test]
    fn test_search_response_parsing() {
        let parsed: SearchResponse = serde_json::from_value(serde_json::json!({
            "took": 3,
            "hits": {"total": {"value": 1}, "hits": [{"_id": "job_1", "_source": {"doc_id": "job_1"}}]}
        }))
        .unwrap();
        assert_eq!(parsed.hits.hits.len(), 1);
        assert_eq!(parsed.hits.hits[0].source["doc_id"], "job_1");
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_search_error() {
        let client = ElasticsearchClient::builder()
            .base_url("http://127.0.0.1:1")
            .timeout_secs(1)
            .build()
            .unwrap();

        let err = client
            .search("boardsync-job", &serde_json::json!({"query": {"match_all": {}}}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SearchExecution { ref index, .. } if index == "boardsync-job"));
    }
}
