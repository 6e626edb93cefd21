//! Analysis pipelines: page analysis, YouTube analysis, and questions.
//!
//! The coordinator drives multi-stage pipelines against the remote
//! workers and streams partial results to the requesting tab as each
//! stage completes, so the overlay renders incrementally instead of
//! waiting for the slowest branch.

mod analyze;
mod question;

use crate::bus::PushHandle;
use crate::events::{PagePayload, TabId};
use crate::session::SessionRegistry;
use crate::workers::WorkerApi;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Source of a tab's current page content.
///
/// Plain (non-Lumen) questions need the page the user is looking at; the
/// real implementation round-trips into the tab's content script.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Current page content of the tab, if the tab can still answer.
    async fn page_content(&self, tab_id: TabId) -> Option<PagePayload>;
}

/// A [`PageSource`] with no tabs to ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPageSource;

#[async_trait]
impl PageSource for NoPageSource {
    async fn page_content(&self, _tab_id: TabId) -> Option<PagePayload> {
        None
    }
}

/// Coordinator for the analysis and question pipelines.
pub struct AnalysisFlow {
    workers: Arc<dyn WorkerApi>,
    sessions: Arc<SessionRegistry>,
    pages: Arc<dyn PageSource>,
    pushes: PushHandle,
    last_topic: Mutex<HashMap<TabId, String>>,
}

impl std::fmt::Debug for AnalysisFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisFlow").finish_non_exhaustive()
    }
}

impl AnalysisFlow {
    /// Create a coordinator.
    #[must_use]
    pub fn new(
        workers: Arc<dyn WorkerApi>,
        sessions: Arc<SessionRegistry>,
        pages: Arc<dyn PageSource>,
        pushes: PushHandle,
    ) -> Self {
        Self {
            workers,
            sessions,
            pages,
            pushes,
            last_topic: Mutex::new(HashMap::new()),
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<TabId, String>> {
        self.last_topic.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remember the tab's detected topic for later question seeding.
    fn remember_topic(&self, tab_id: TabId, topic: &str) {
        if !topic.is_empty() {
            self.topics().insert(tab_id, topic.to_string());
        }
    }

    /// The last topic detected for a tab, if any.
    #[must_use]
    pub fn last_topic(&self, tab_id: TabId) -> Option<String> {
        self.topics().get(&tab_id).cloned()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::{WorkerError, WorkerResult};
    use crate::workers::{Worker, WorkerApi};
    use serde_json::{Value, json};
    use std::collections::HashSet;

    /// Scriptable worker backend recording every call.
    #[derive(Default)]
    pub struct MockWorkers {
        responses: Mutex<HashMap<Worker, Value>>,
        failing: Mutex<HashSet<Worker>>,
        calls: Mutex<Vec<(Worker, Value)>>,
    }

    impl MockWorkers {
        pub fn respond(&self, worker: Worker, value: Value) {
            self.responses.lock().unwrap().insert(worker, value);
        }

        pub fn fail(&self, worker: Worker) {
            self.failing.lock().unwrap().insert(worker);
        }

        pub fn calls(&self) -> Vec<(Worker, Value)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, worker: Worker) -> Vec<Value> {
            self.calls()
                .into_iter()
                .filter(|(w, _)| *w == worker)
                .map(|(_, body)| body)
                .collect()
        }
    }

    #[async_trait]
    impl WorkerApi for MockWorkers {
        async fn call(&self, worker: Worker, body: Value) -> WorkerResult<Value> {
            crate::workers::check_query(worker, &body)?;
            self.calls.lock().unwrap().push((worker, body));
            if self.failing.lock().unwrap().contains(&worker) {
                return Err(WorkerError::remote(worker.wire_name(), 500, "mock failure"));
            }
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(&worker)
                .cloned()
                .unwrap_or_else(|| json!({})))
        }
    }

    /// A [`PageSource`] returning one fixed payload.
    pub struct FixedPage(pub Option<PagePayload>);

    #[async_trait]
    impl PageSource for FixedPage {
        async fn page_content(&self, _tab_id: TabId) -> Option<PagePayload> {
            self.0.clone()
        }
    }

    /// Build a flow over mock workers plus the bus it pushes through.
    pub fn flow_with(
        workers: Arc<MockWorkers>,
        pages: Arc<dyn PageSource>,
    ) -> (AnalysisFlow, crate::bus::MessageBus, Arc<SessionRegistry>) {
        let bus = crate::bus::MessageBus::new();
        let sessions = Arc::new(SessionRegistry::new(workers.clone()));
        let flow = AnalysisFlow::new(workers, sessions.clone(), pages, bus.push_handle());
        (flow, bus, sessions)
    }
}
