//! PageLens - background coordinator for an AI page-analysis overlay.
//!
//! The coordinator sits between an injected page UI and a set of remote
//! worker endpoints performing search, LLM inference and video lookup.
//! It owns the only stateful concerns of the system:
//!
//! - **Message Router** ([`router`]) - dispatches UI requests and manages
//!   the asynchronous-response contract
//! - **Session Registry** ([`session`]) - per-tab, per-mode session
//!   lifecycle and remote content-cache teardown
//! - **Analysis Flow** ([`flows`]) - the multi-branch analysis pipeline
//!   with incremental result streaming
//! - **Worker Client** ([`workers`]) - one-shot JSON RPC to the remote
//!   capabilities
//! - **Message Bus** ([`bus`]) - tab-keyed delivery between UI and router
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pagelens::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config().await?;
//!     let gateway = Gateway::new(&config)?;
//!     gateway.run().await
//! }
//! ```

// Core modules
pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod flows;
pub mod gateway;
pub mod router;
pub mod session;
pub mod util;
pub mod workers;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error types (centralized)
    pub use crate::error::{
        BusError, BusResult, ConfigError, ConfigResult, PageLensError, Result, WorkerError,
        WorkerResult,
    };

    // Bus
    pub use crate::bus::{BusStats, InboundHandle, MessageBus, PushHandle};

    // Config
    pub use crate::config::{Config, config_dir, config_path, init_config, load_config, save_config};

    // Events
    pub use crate::events::{
        AnalysisUpdate, PagePayload, SourceRef, TabId, TabMessage, TabPush, TranscriptLine,
        UiMessage, UiRequest, UiResponse, Video, VideoAnalysis,
    };

    // Flows
    pub use crate::flows::{AnalysisFlow, NoPageSource, PageSource};

    // Gateway
    pub use crate::gateway::{Gateway, GatewayStatus};

    // Router
    pub use crate::router::{Router, RouterConfig};

    // Session
    pub use crate::session::{Mode, SessionRegistry};

    // Workers
    pub use crate::workers::{
        AnalyzerReport, ClearReport, HttpWorkerClient, InsightsReport, QaReport, SearchReport,
        TranscriptReport, Worker, WorkerApi, WorkerEndpoints,
    };

    // Utilities
    pub use crate::util::{generate_message_id, timestamp_ms, truncate_str};
}
