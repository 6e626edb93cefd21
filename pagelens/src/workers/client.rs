//! HTTP implementation of the worker client.

use super::{Worker, WorkerApi, WorkerEndpoints, check_query};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult, WorkerError, WorkerResult};
use crate::util::truncate_str;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Worker client performing one outbound `POST` per call.
///
/// No retry and no caching here; the caller owns retry policy. Any number
/// of calls may be in flight at once and ordering between them is not
/// guaranteed. Each call is bounded by the configured timeout; expiry
/// surfaces as a transport error.
#[derive(Clone)]
pub struct HttpWorkerClient {
    http: reqwest::Client,
    endpoints: WorkerEndpoints,
    search_api_key: Option<String>,
}

impl std::fmt::Debug for HttpWorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWorkerClient")
            .field("endpoints", &self.endpoints)
            .field("search_api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpWorkerClient {
    /// Build a client from persisted configuration.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::invalid(format!("http client: {e}")))?;

        Ok(Self {
            http,
            endpoints: WorkerEndpoints::from_config(config),
            search_api_key: config.search_api_key.clone(),
        })
    }

    /// The endpoint table in use.
    #[must_use]
    pub fn endpoints(&self) -> &WorkerEndpoints {
        &self.endpoints
    }

    /// Attach the search API key to search request bodies.
    fn prepare_body(&self, worker: Worker, mut body: Value) -> Value {
        if worker == Worker::Search
            && let Some(key) = &self.search_api_key
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("serperApiKey".to_string(), Value::String(key.clone()));
        }
        body
    }
}

#[async_trait]
impl WorkerApi for HttpWorkerClient {
    async fn call(&self, worker: Worker, body: Value) -> WorkerResult<Value> {
        check_query(worker, &body)?;

        let url = self.endpoints.resolve(worker);
        let body = self.prepare_body(worker, body);
        debug!(worker = worker.wire_name(), %url, "calling worker");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkerError::transport(worker.wire_name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                worker = worker.wire_name(),
                status = status.as_u16(),
                body = truncate_str(&text, 500),
                "worker returned error status"
            );
            return Err(WorkerError::remote(
                worker.wire_name(),
                status.as_u16(),
                text,
            ));
        }

        let json: Value =
            response
                .json()
                .await
                .map_err(|e| WorkerError::InvalidResponse {
                    worker: worker.wire_name(),
                    message: e.to_string(),
                })?;

        debug!(
            worker = worker.wire_name(),
            response = truncate_str(&json.to_string(), 800),
            "worker response"
        );
        Ok(json)
    }
}
