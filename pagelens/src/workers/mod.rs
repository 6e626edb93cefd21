//! Remote worker capabilities and the client seam.
//!
//! Each capability is a fixed remote HTTP endpoint taking a JSON body and
//! returning a capability-specific JSON object. The [`WorkerApi`] trait is
//! the seam between the coordinator and the transport, so flows and the
//! session registry can be exercised against an in-memory implementation.

mod client;
mod types;

pub use client::HttpWorkerClient;
pub use types::{
    AnalyzerReport, ClearReport, InsightsReport, QaReport, SearchReport, TranscriptReport,
};

use crate::config::Config;
use crate::error::{WorkerError, WorkerResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Base URL of the default worker deployment.
pub const DEFAULT_API_BASE: &str = "https://pagelens-api.overlay.workers.dev";

/// A remote worker capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Worker {
    /// Topic and entity extraction for a page.
    Analyzer,
    /// Related-video search.
    Search,
    /// Insight and take generation.
    Insights,
    /// Retrieval-augmented question answering.
    Qa,
    /// Question answering over supplied page content.
    AnalyzeQuestion,
    /// YouTube transcript fetch.
    YoutubeTranscript,
    /// Session content-cache teardown.
    ClearSession,
}

impl Worker {
    /// Wire name of the capability, used for overrides and error messages.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Analyzer => "analyzer",
            Self::Search => "search",
            Self::Insights => "insights",
            Self::Qa => "qa",
            Self::AnalyzeQuestion => "analyze_question",
            Self::YoutubeTranscript => "youtube_transcript",
            Self::ClearSession => "clear_session",
        }
    }

    /// URL path of the capability on the default deployment.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Analyzer => "/analyzer",
            Self::Search => "/search",
            Self::Insights => "/insights",
            Self::Qa => "/qa",
            Self::AnalyzeQuestion => "/analyze_question",
            Self::YoutubeTranscript => "/youtube_transcript",
            Self::ClearSession => "/clear-session",
        }
    }

    /// Whether this capability carries a user query that must not be blank.
    #[must_use]
    pub const fn requires_query(self) -> bool {
        matches!(self, Self::Qa | Self::AnalyzeQuestion)
    }
}

/// Resolved endpoint table: user overrides over compiled-in defaults.
#[derive(Debug, Clone, Default)]
pub struct WorkerEndpoints {
    overrides: HashMap<String, String>,
}

impl WorkerEndpoints {
    /// Build the table from persisted configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            overrides: config.workers.clone(),
        }
    }

    /// Destination URL for a capability.
    ///
    /// Teardown has no standalone default: its URL derives from the API
    /// base so it always lands on the same deployment as the analyzer.
    #[must_use]
    pub fn resolve(&self, worker: Worker) -> String {
        if let Some(url) = self.overrides.get(worker.wire_name()) {
            return url.clone();
        }
        match worker {
            Worker::ClearSession => format!("{}{}", self.api_base_url(), worker.path()),
            _ => format!("{DEFAULT_API_BASE}{}", worker.path()),
        }
    }

    /// Base address of the remote API, derived from the analyzer endpoint
    /// by stripping its path suffix.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        let analyzer = self
            .overrides
            .get(Worker::Analyzer.wire_name())
            .cloned()
            .unwrap_or_else(|| format!("{DEFAULT_API_BASE}{}", Worker::Analyzer.path()));

        match url::Url::parse(&analyzer) {
            Ok(u) => {
                let base_path = u.path().trim_end_matches("/analyzer");
                let host = u.host_str().unwrap_or_default();
                match u.port() {
                    Some(port) => format!("{}://{host}:{port}{base_path}", u.scheme()),
                    None => format!("{}://{host}{base_path}", u.scheme()),
                }
            }
            Err(_) => analyzer.trim_end_matches("/analyzer").to_string(),
        }
    }
}

/// Client seam for invoking remote workers.
///
/// One outbound request per call, no retry, no caching; failures always
/// propagate to the caller.
#[async_trait]
pub trait WorkerApi: Send + Sync {
    /// Invoke a capability with a JSON body and return its JSON response.
    async fn call(&self, worker: Worker, body: Value) -> WorkerResult<Value>;

    /// Ask the remote store to delete every cache entry under the
    /// session's key prefix.
    async fn clear_session(&self, session_id: &str) -> WorkerResult<ClearReport> {
        let value = self
            .call(Worker::ClearSession, json!({ "sessionId": session_id }))
            .await?;
        types::decode(Worker::ClearSession, value)
    }
}

/// Reject blank user queries before any network I/O.
pub(crate) fn check_query(worker: Worker, body: &Value) -> WorkerResult<()> {
    if worker.requires_query() {
        let blank = body
            .get("query")
            .and_then(Value::as_str)
            .is_none_or(|q| q.trim().is_empty());
        if blank {
            return Err(WorkerError::EmptyQuery);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = WorkerEndpoints::default();
        assert_eq!(
            endpoints.resolve(Worker::Analyzer),
            format!("{DEFAULT_API_BASE}/analyzer")
        );
        assert_eq!(
            endpoints.resolve(Worker::ClearSession),
            format!("{DEFAULT_API_BASE}/clear-session")
        );
    }

    #[test]
    fn test_override_takes_precedence() {
        let mut config = Config::default();
        config.workers.insert(
            "search".to_string(),
            "http://127.0.0.1:8787/search".to_string(),
        );
        let endpoints = WorkerEndpoints::from_config(&config);
        assert_eq!(endpoints.resolve(Worker::Search), "http://127.0.0.1:8787/search");
        // others still default
        assert_eq!(
            endpoints.resolve(Worker::Qa),
            format!("{DEFAULT_API_BASE}/qa")
        );
    }

    #[test]
    fn test_base_url_derived_from_analyzer_override() {
        let mut config = Config::default();
        config.workers.insert(
            "analyzer".to_string(),
            "http://127.0.0.1:8787/v2/analyzer".to_string(),
        );
        let endpoints = WorkerEndpoints::from_config(&config);
        assert_eq!(endpoints.api_base_url(), "http://127.0.0.1:8787/v2");
        assert_eq!(
            endpoints.resolve(Worker::ClearSession),
            "http://127.0.0.1:8787/v2/clear-session"
        );
    }

    #[test]
    fn test_blank_query_guard() {
        let body = serde_json::json!({ "query": "   " });
        assert!(matches!(
            check_query(Worker::Qa, &body),
            Err(WorkerError::EmptyQuery)
        ));
        assert!(check_query(Worker::Search, &body).is_ok());

        let body = serde_json::json!({});
        assert!(matches!(
            check_query(Worker::AnalyzeQuestion, &body),
            Err(WorkerError::EmptyQuery)
        ));
    }
}
