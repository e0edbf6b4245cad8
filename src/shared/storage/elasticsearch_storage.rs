use crate::features::system_metrics::HealthSample;
use crate::shared::config::StoreConfig;
use crate::shared::error::StorageError;
use crate::shared::traits::{SampleStore, StoreConnection};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elasticsearch::{
    auth::Credentials,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    params::Refresh,
    Elasticsearch, IndexParts, SearchParts,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// Document layout of one sample in the index.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSample {
    cpu_usage: f64,
    disk_usage: f64,
    check_time: DateTime<Utc>,
    /// Insertion instant in nanoseconds, breaks `check_time` ties.
    recorded_at: i64,
}

impl StoredSample {
    fn from_sample(sample: &HealthSample, recorded_at: i64) -> Self {
        Self {
            cpu_usage: sample.cpu_usage,
            disk_usage: sample.disk_usage,
            check_time: sample.check_time,
            recorded_at,
        }
    }

    fn into_sample(self) -> HealthSample {
        HealthSample {
            cpu_usage: self.cpu_usage,
            disk_usage: self.disk_usage,
            check_time: self.check_time,
        }
    }
}

fn latest_sample_query() -> Value {
    json!({
        "size": 1,
        "sort": [
            { "check_time": { "order": "desc", "unmapped_type": "date" } },
            { "recorded_at": { "order": "desc", "unmapped_type": "long" } }
        ]
    })
}

fn parse_latest_sample(body: &Value) -> Result<Option<HealthSample>, StorageError> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| StorageError::Read("search response has no hits array".to_string()))?;

    match hits.first() {
        None => Ok(None),
        Some(hit) => {
            let stored: StoredSample = serde_json::from_value(hit["_source"].clone())
                .map_err(|e| StorageError::Read(format!("malformed sample document: {}", e)))?;
            Ok(Some(stored.into_sample()))
        }
    }
}

/// Stores samples as documents of a single Elasticsearch index.
pub struct ElasticsearchStore {
    url: Url,
    credentials: Option<(String, String)>,
    index: String,
}

impl ElasticsearchStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StorageError> {
        let url = Url::parse(&config.url)
            .map_err(|e| StorageError::Connection(format!("invalid store url {}: {}", config.url, e)))?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            url,
            credentials,
            index: config.index.clone(),
        })
    }

    fn build_client(&self) -> Result<Elasticsearch, StorageError> {
        let conn_pool = SingleNodeConnectionPool::new(self.url.clone());
        let mut builder = TransportBuilder::new(conn_pool);

        if let Some((username, password)) = &self.credentials {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }

        let transport = builder
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Elasticsearch::new(transport))
    }
}

#[async_trait]
impl SampleStore for ElasticsearchStore {
    type Connection = ElasticsearchConnection;

    async fn connect(&self) -> Result<ElasticsearchConnection, StorageError> {
        let client = self.build_client()?;

        let response = client
            .ping()
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(StorageError::Connection(format!(
                "Elasticsearch ping returned status: {}",
                response.status_code()
            )));
        }

        info!("Connected to Elasticsearch at {}", self.url);
        Ok(ElasticsearchConnection {
            client,
            index: self.index.clone(),
        })
    }
}

pub struct ElasticsearchConnection {
    client: Elasticsearch,
    index: String,
}

#[async_trait]
impl StoreConnection for ElasticsearchConnection {
    async fn insert(&mut self, sample: &HealthSample) -> Result<(), StorageError> {
        let recorded_at = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let document = StoredSample::from_sample(sample, recorded_at);

        let response = self
            .client
            .index(IndexParts::Index(&self.index))
            .refresh(Refresh::WaitFor)
            .body(document)
            .send()
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        if !response.status_code().is_success() {
            error!("Failed to store sample: {:?}", response);
            return Err(StorageError::Write(format!(
                "Elasticsearch returned error status: {}",
                response.status_code()
            )));
        }

        debug!("Stored sample in index {}", self.index);
        Ok(())
    }

    async fn query_latest(&mut self) -> Result<Option<HealthSample>, StorageError> {
        let index = [self.index.as_str()];
        let response = self
            .client
            .search(SearchParts::Index(&index))
            .body(latest_sample_query())
            .send()
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            // index is created by the first insert
            debug!("Index {} does not exist yet", self.index);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StorageError::Read(format!(
                "Elasticsearch returned error status: {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;

        parse_latest_sample(&body)
    }

    async fn close(self) {
        drop(self.client);
        debug!("Released Elasticsearch connection");
    }
}
