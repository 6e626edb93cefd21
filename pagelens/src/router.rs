//! Message router: the single entry point for UI requests.
//!
//! The router consumes inbound envelopes from the bus and dispatches to
//! the session registry or the analysis flow. Each message is handled on
//! its own task so a slow pipeline never blocks unrelated requests, and
//! every message reaches exactly one terminal outcome (a direct response,
//! a push to the tab, or both), even when a handler step fails.

use crate::bus::MessageBus;
use crate::error::Result;
use crate::events::{TabMessage, UiMessage, UiRequest, UiResponse};
use crate::flows::AnalysisFlow;
use crate::session::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Router loop configuration.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Poll interval for the shutdown flag while the queue is idle.
    pub idle_poll: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_secs(1),
        }
    }
}

/// The router processing loop.
pub struct Router {
    bus: MessageBus,
    sessions: Arc<SessionRegistry>,
    flow: Arc<AnalysisFlow>,
    config: RouterConfig,
    running: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router over the given bus and collaborators.
    #[must_use]
    pub fn new(bus: MessageBus, sessions: Arc<SessionRegistry>, flow: Arc<AnalysisFlow>) -> Self {
        Self {
            bus,
            sessions,
            flow,
            config: RouterConfig::default(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run the router loop until stopped.
    pub async fn run(&self) -> Result<()> {
        *self.running.write().await = true;
        info!("router started");

        while *self.running.read().await {
            let Some(msg) = self.bus.consume_inbound_timeout(self.config.idle_poll).await
            else {
                continue;
            };

            debug!(tab = msg.tab_id, request = ?msg.request, "dispatching request");
            let sessions = Arc::clone(&self.sessions);
            let flow = Arc::clone(&self.flow);
            let bus = self.bus.clone();
            tokio::spawn(async move {
                dispatch(&bus, &sessions, &flow, msg).await;
            });
        }

        info!("router stopped");
        Ok(())
    }

    /// Stop the router loop.
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// Check if the loop is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

/// Handle one request to its terminal outcome.
async fn dispatch(
    bus: &MessageBus,
    sessions: &SessionRegistry,
    flow: &AnalysisFlow,
    msg: UiMessage,
) {
    let tab_id = msg.tab_id;
    let responder = msg.responder;

    match msg.request {
        UiRequest::LumenToggle { enabled } => {
            sessions.toggle_mode(tab_id, enabled);
            respond(responder, UiResponse::Ack { ok: true });
        }

        UiRequest::SessionEnd => {
            let cleared = sessions.end_session(tab_id).await;
            respond(responder, UiResponse::SessionEnd { cleared });
        }

        UiRequest::TabClosed => {
            sessions.on_tab_closed(tab_id).await;
            respond(responder, UiResponse::Ack { ok: true });
        }

        UiRequest::AnalyzePage { payload } => {
            let merged = flow.handle_analysis(tab_id, payload).await;
            bus.push_to_tab(TabMessage::result(tab_id, merged.clone())).await;
            respond(responder, UiResponse::Analysis(merged));
        }

        UiRequest::Question { query, lumen } => match flow.handle_question(tab_id, &query, lumen).await {
            Ok(()) => respond(responder, UiResponse::Ack { ok: true }),
            Err(e) => {
                let error = e.to_string();
                bus.push_to_tab(TabMessage::error(tab_id, error.clone())).await;
                respond(responder, UiResponse::Error { error });
            }
        },
    }
}

/// Resolve the direct-response channel, if the caller attached one.
fn respond(responder: Option<oneshot::Sender<UiResponse>>, response: UiResponse) {
    if let Some(tx) = responder
        && tx.send(response).is_err()
    {
        warn!("caller dropped before response was delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PagePayload, TabPush};
    use crate::flows::NoPageSource;
    use crate::flows::testing::MockWorkers;
    use crate::workers::Worker;
    use serde_json::json;

    struct Fixture {
        bus: MessageBus,
        workers: Arc<MockWorkers>,
        sessions: Arc<SessionRegistry>,
    }

    fn start_router() -> Fixture {
        let bus = MessageBus::new();
        let workers = Arc::new(MockWorkers::default());
        let sessions = Arc::new(SessionRegistry::new(workers.clone()));
        let flow = Arc::new(AnalysisFlow::new(
            workers.clone(),
            sessions.clone(),
            Arc::new(NoPageSource),
            bus.push_handle(),
        ));
        let router = Arc::new(Router::new(bus.clone(), sessions.clone(), flow));
        let handle = router.clone();
        tokio::spawn(async move { handle.run().await });

        Fixture {
            bus,
            workers,
            sessions,
        }
    }

    #[tokio::test]
    async fn test_session_end_responds_with_cleared_count() {
        let fx = start_router();
        fx.sessions.get_or_create(1, crate::session::Mode::On);
        fx.sessions.get_or_create(1, crate::session::Mode::Off);

        let (msg, rx) = UiMessage::with_responder(1, UiRequest::SessionEnd);
        fx.bus.publish_inbound(msg).await.unwrap();

        match rx.await.unwrap() {
            UiResponse::SessionEnd { cleared } => assert_eq!(cleared, 2),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_toggle_is_handled_and_acked() {
        let fx = start_router();

        let (msg, rx) = UiMessage::with_responder(4, UiRequest::LumenToggle { enabled: true });
        fx.bus.publish_inbound(msg).await.unwrap();
        assert!(matches!(rx.await.unwrap(), UiResponse::Ack { ok: true }));

        assert!(fx.sessions.session_for(4, crate::session::Mode::On).is_some());
    }

    #[tokio::test]
    async fn test_analyze_page_responds_and_pushes_final_result() {
        let fx = start_router();
        fx.workers.respond(Worker::Analyzer, json!({ "topic": "Topic" }));
        let mut tab_rx = fx.bus.subscribe_tab(2).await;

        let (msg, rx) = UiMessage::with_responder(
            2,
            UiRequest::AnalyzePage {
                payload: PagePayload {
                    title: "T".into(),
                    url: "https://example.com".into(),
                    text: "body".into(),
                    ..PagePayload::default()
                },
            },
        );
        fx.bus.publish_inbound(msg).await.unwrap();

        let response = rx.await.unwrap();
        let merged = match response {
            UiResponse::Analysis(update) => update,
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(merged.qa, Some(false));

        // final merged payload is also pushed to the tab
        let mut saw_final = false;
        while let Ok(pushed) = tab_rx.try_recv() {
            if let TabPush::AnalysisResult { payload } = pushed.push
                && payload.videos.is_some()
                && payload.takes.is_some()
            {
                saw_final = true;
            }
        }
        assert!(saw_final);
    }

    #[tokio::test]
    async fn test_blank_question_pushes_error() {
        let fx = start_router();
        let mut tab_rx = fx.bus.subscribe_tab(9).await;

        let (msg, rx) = UiMessage::with_responder(
            9,
            UiRequest::Question {
                query: "   ".into(),
                lumen: true,
            },
        );
        fx.bus.publish_inbound(msg).await.unwrap();

        assert!(matches!(rx.await.unwrap(), UiResponse::Error { .. }));
        let pushed = tab_rx.recv().await.unwrap();
        assert!(matches!(pushed.push, TabPush::AnalysisError { .. }));
        assert!(fx.workers.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tab_closed_clears_sessions() {
        let fx = start_router();
        fx.sessions.get_or_create(6, crate::session::Mode::Off);

        let (msg, rx) = UiMessage::with_responder(6, UiRequest::TabClosed);
        fx.bus.publish_inbound(msg).await.unwrap();
        rx.await.unwrap();

        assert_eq!(fx.sessions.tab_count(), 0);
    }
}
