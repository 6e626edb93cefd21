//! Gateway: wiring and lifecycle for the complete coordinator.
//!
//! Builds the worker client from configuration, owns the bus, session
//! registry, flow coordinator and router, and runs the processing loop.

use crate::bus::{InboundHandle, MessageBus};
use crate::config::Config;
use crate::error::Result;
use crate::flows::{AnalysisFlow, NoPageSource, PageSource};
use crate::router::Router;
use crate::session::SessionRegistry;
use crate::workers::HttpWorkerClient;
use std::sync::Arc;
use tracing::info;

/// Gateway service running the coordinator.
pub struct Gateway {
    bus: MessageBus,
    sessions: Arc<SessionRegistry>,
    router: Router,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

impl Gateway {
    /// Build a gateway from configuration, with no page source attached.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_page_source(config, Arc::new(NoPageSource))
    }

    /// Build a gateway with the given page-content collaborator.
    pub fn with_page_source(config: &Config, pages: Arc<dyn PageSource>) -> Result<Self> {
        let workers = Arc::new(HttpWorkerClient::from_config(config)?);
        let bus = MessageBus::new();
        let sessions = Arc::new(SessionRegistry::new(workers.clone()));
        let flow = Arc::new(AnalysisFlow::new(
            workers,
            sessions.clone(),
            pages,
            bus.push_handle(),
        ));
        let router = Router::new(bus.clone(), sessions.clone(), flow);

        Ok(Self {
            bus,
            sessions,
            router,
        })
    }

    /// The message bus.
    #[must_use]
    pub const fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Handle for publishing inbound UI requests.
    #[must_use]
    pub fn inbound_handle(&self) -> InboundHandle {
        self.bus.inbound_handle()
    }

    /// The session registry.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Run the router loop until stopped.
    pub async fn run(&self) -> Result<()> {
        info!("gateway starting");
        let result = self.router.run().await;
        info!("gateway stopped");
        result
    }

    /// Stop the router loop.
    pub async fn stop(&self) {
        self.router.stop().await;
    }

    /// Current status snapshot.
    pub async fn status(&self) -> GatewayStatus {
        let stats = self.bus.stats().await;
        GatewayStatus {
            running: self.router.is_running().await,
            tabs_with_sessions: self.sessions.tab_count(),
            inbound: stats.inbound_count,
            pushed: stats.push_count,
            dropped: stats.dropped_count,
        }
    }
}

/// Gateway status information.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GatewayStatus {
    /// Whether the router loop is running.
    pub running: bool,
    /// Tabs with at least one live session.
    pub tabs_with_sessions: usize,
    /// Inbound requests accepted.
    pub inbound: u64,
    /// Pushes delivered.
    pub pushed: u64,
    /// Pushes dropped for closed tabs.
    pub dropped: u64,
}
