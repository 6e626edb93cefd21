//! Question pipelines: Lumen (retrieval-augmented) and plain page mode.

use super::AnalysisFlow;
use crate::error::{WorkerError, WorkerResult};
use crate::events::{AnalysisUpdate, TabId, TabMessage, Video};
use crate::session::Mode;
use crate::workers::{QaReport, SearchReport, Worker};
use serde_json::json;
use tracing::{debug, warn};

impl AnalysisFlow {
    /// Answer a user question, pushing the result to the tab.
    ///
    /// Errors propagate to the router, which turns them into an
    /// `ANALYSIS_ERROR` push; a blank query is rejected before any remote
    /// call.
    pub async fn handle_question(
        &self,
        tab_id: TabId,
        query: &str,
        lumen: bool,
    ) -> WorkerResult<()> {
        if query.trim().is_empty() {
            return Err(WorkerError::EmptyQuery);
        }
        if lumen {
            self.lumen_question(tab_id, query).await
        } else {
            self.page_question(tab_id, query).await
        }
    }

    /// Lumen mode: answer from the session's retrieval cache.
    ///
    /// Each invocation writes fetched article content into the session's
    /// remote cache, which the registry later tears down.
    async fn lumen_question(&self, tab_id: TabId, query: &str) -> WorkerResult<()> {
        let topic = self.last_topic(tab_id).unwrap_or_default();
        let session_id = self.sessions.get_or_create(tab_id, Mode::On);
        debug!(tab = tab_id, session = %session_id, topic = %topic, "lumen question");

        let qa = self
            .workers
            .call(
                Worker::Qa,
                json!({ "query": query, "topic": topic, "sessionId": session_id }),
            )
            .await
            .and_then(|v| QaReport::from_value(Worker::Qa, v))?;

        let videos = self
            .related_videos(json!({ "topic": topic, "pageContent": "", "query": query }))
            .await;

        self.pushes
            .push(TabMessage::result(
                tab_id,
                AnalysisUpdate {
                    insights: Some(vec![qa.answer]),
                    videos: Some(videos),
                    sources: Some(qa.sources),
                    qa: Some(true),
                    ..AnalysisUpdate::default()
                },
            ))
            .await;
        Ok(())
    }

    /// Plain mode: answer against the tab's current page content.
    async fn page_question(&self, tab_id: TabId, query: &str) -> WorkerResult<()> {
        let Some(page) = self.pages.page_content(tab_id).await else {
            return Err(WorkerError::transport(
                Worker::AnalyzeQuestion.wire_name(),
                "page content unavailable",
            ));
        };

        let answer = self
            .workers
            .call(
                Worker::AnalyzeQuestion,
                json!({
                    "query": query,
                    "title": page.title,
                    "url": page.url,
                    "text": page.text
                }),
            )
            .await
            .and_then(|v| QaReport::from_value(Worker::AnalyzeQuestion, v))?;

        let videos = self
            .related_videos(json!({
                "topic": page.title,
                "pageContent": page.text,
                "query": query
            }))
            .await;

        self.pushes
            .push(TabMessage::result(
                tab_id,
                AnalysisUpdate {
                    insights: Some(vec![answer.answer]),
                    videos: Some(videos),
                    sources: Some(Vec::new()),
                    qa: Some(true),
                    ..AnalysisUpdate::default()
                },
            ))
            .await;
        Ok(())
    }

    /// Related-video lookup for a question; degrades to none on failure.
    async fn related_videos(&self, body: serde_json::Value) -> Vec<Video> {
        match self
            .workers
            .call(Worker::Search, body)
            .await
            .and_then(SearchReport::from_value)
        {
            Ok(report) => report.videos,
            Err(e) => {
                warn!(error = %e, "video search for question failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FixedPage, MockWorkers, flow_with};
    use super::*;
    use crate::events::{PagePayload, TabPush};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_blank_query_rejected_before_any_call() {
        let workers = Arc::new(MockWorkers::default());
        let (flow, _bus, _) = flow_with(workers.clone(), Arc::new(FixedPage(None)));

        let err = flow.handle_question(1, "   ", true).await.unwrap_err();
        assert!(matches!(err, WorkerError::EmptyQuery));
        assert!(workers.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lumen_question_uses_on_mode_session_and_topic() {
        let workers = Arc::new(MockWorkers::default());
        workers.respond(
            Worker::Qa,
            json!({ "answer": "because of the borrow checker", "sources": [] }),
        );
        workers.respond(Worker::Search, json!({ "videos": [] }));
        let (flow, bus, sessions) = flow_with(workers.clone(), Arc::new(FixedPage(None)));
        flow.remember_topic(3, "Rust ownership");
        let mut rx = bus.subscribe_tab(3).await;

        flow.handle_question(3, "why borrows?", true).await.unwrap();

        let session_id = sessions.session_for(3, Mode::On).unwrap();
        let qa_calls = workers.calls_to(Worker::Qa);
        assert_eq!(qa_calls[0]["sessionId"], json!(session_id));
        assert_eq!(qa_calls[0]["topic"], "Rust ownership");

        let pushed = rx.try_recv().unwrap();
        match pushed.push {
            TabPush::AnalysisResult { payload } => {
                assert_eq!(
                    payload.insights,
                    Some(vec!["because of the borrow checker".to_string()])
                );
                assert_eq!(payload.qa, Some(true));
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lumen_search_failure_degrades_to_no_videos() {
        let workers = Arc::new(MockWorkers::default());
        workers.respond(Worker::Qa, json!({ "answer": "yes", "sources": [] }));
        workers.fail(Worker::Search);
        let (flow, bus, _) = flow_with(workers, Arc::new(FixedPage(None)));
        let mut rx = bus.subscribe_tab(1).await;

        flow.handle_question(1, "does it?", true).await.unwrap();

        match rx.try_recv().unwrap().push {
            TabPush::AnalysisResult { payload } => {
                assert_eq!(payload.videos, Some(Vec::new()));
                assert_eq!(payload.insights, Some(vec!["yes".to_string()]));
            }
            other => panic!("unexpected push: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_page_question_round_trips_page_content() {
        let workers = Arc::new(MockWorkers::default());
        workers.respond(Worker::AnalyzeQuestion, json!({ "answer": "from the page" }));
        workers.respond(Worker::Search, json!({ "videos": [] }));
        let page = PagePayload {
            title: "Lifetimes".to_string(),
            url: "https://example.com/lt".to_string(),
            text: "lifetimes are regions".to_string(),
            ..PagePayload::default()
        };
        let (flow, _bus, sessions) = flow_with(workers.clone(), Arc::new(FixedPage(Some(page))));

        flow.handle_question(1, "what are lifetimes?", false)
            .await
            .unwrap();

        let calls = workers.calls_to(Worker::AnalyzeQuestion);
        assert_eq!(calls[0]["title"], "Lifetimes");
        assert_eq!(calls[0]["text"], "lifetimes are regions");
        // plain mode never allocates a session
        assert_eq!(sessions.tab_count(), 0);
    }

    #[tokio::test]
    async fn test_page_question_without_content_errors() {
        let workers = Arc::new(MockWorkers::default());
        let (flow, _bus, _) = flow_with(workers.clone(), Arc::new(FixedPage(None)));

        let err = flow.handle_question(1, "anyone there?", false).await.unwrap_err();
        assert!(matches!(err, WorkerError::Transport { .. }));
        assert!(workers.calls_to(Worker::AnalyzeQuestion).is_empty());
    }
}
