//! Async message bus between the injected UI and the coordinator.
//!
//! Inbound requests flow through a single mpsc queue consumed by the
//! router loop. Outbound pushes are targeted at one tab: a push to a tab
//! with no live subscriber is dropped and counted, not an error, since the
//! tab may have closed while a pipeline was still in flight.

use crate::error::{BusError, BusResult};
use crate::events::{TabId, TabMessage, UiMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, trace};

/// Default capacity for message queues.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Async message bus connecting tabs to the router.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<MessageBusInner>,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus").finish_non_exhaustive()
    }
}

struct MessageBusInner {
    /// Inbound request queue (tabs → router).
    inbound_tx: mpsc::Sender<UiMessage>,
    inbound_rx: RwLock<Option<mpsc::Receiver<UiMessage>>>,

    /// Per-tab push subscribers.
    tab_subscribers: RwLock<HashMap<TabId, Vec<mpsc::Sender<TabMessage>>>>,

    /// Statistics.
    stats: RwLock<BusStats>,
}

/// Message bus statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusStats {
    /// Total inbound requests accepted.
    pub inbound_count: u64,
    /// Total pushes delivered to at least one subscriber.
    pub push_count: u64,
    /// Pushes dropped because the target tab had no subscriber.
    pub dropped_count: u64,
}

impl MessageBus {
    /// Create a new message bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a new message bus with the given queue capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(MessageBusInner {
                inbound_tx,
                inbound_rx: RwLock::new(Some(inbound_rx)),
                tab_subscribers: RwLock::new(HashMap::new()),
                stats: RwLock::new(BusStats::default()),
            }),
        }
    }

    /// Publish an inbound request from a tab to the router.
    pub async fn publish_inbound(&self, msg: UiMessage) -> BusResult<()> {
        trace!(tab = msg.tab_id, id = %msg.id, "publishing inbound request");

        self.inner
            .inbound_tx
            .send(msg)
            .await
            .map_err(|_| BusError::InboundClosed)?;

        self.inner.stats.write().await.inbound_count += 1;
        Ok(())
    }

    /// Consume the next inbound request.
    ///
    /// This should only be called by the router loop. Returns `None` when
    /// the bus is closed.
    pub async fn consume_inbound(&self) -> Option<UiMessage> {
        let mut rx_guard = self.inner.inbound_rx.write().await;
        if let Some(rx) = rx_guard.as_mut() {
            rx.recv().await
        } else {
            None
        }
    }

    /// Try to consume the next inbound request with a timeout.
    pub async fn consume_inbound_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Option<UiMessage> {
        let mut rx_guard = self.inner.inbound_rx.write().await;
        if let Some(rx) = rx_guard.as_mut() {
            tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
        } else {
            None
        }
    }

    /// Push a message to the target tab.
    ///
    /// The push is dropped (and counted) when the tab has no live
    /// subscriber. Disconnected subscribers are pruned on the way.
    pub async fn push_to_tab(&self, msg: TabMessage) {
        trace!(tab = msg.tab_id, "pushing to tab");

        let mut delivered = false;
        {
            let mut subscribers = self.inner.tab_subscribers.write().await;
            if let Some(senders) = subscribers.get_mut(&msg.tab_id) {
                senders.retain(|sender| match sender.try_send(msg.clone()) {
                    Ok(()) => {
                        delivered = true;
                        true
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => true,
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
                if senders.is_empty() {
                    subscribers.remove(&msg.tab_id);
                }
            }
        }

        let mut stats = self.inner.stats.write().await;
        if delivered {
            stats.push_count += 1;
        } else {
            stats.dropped_count += 1;
            debug!(tab = msg.tab_id, "push dropped, no subscriber for tab");
        }
    }

    /// Subscribe to pushes for one tab.
    pub async fn subscribe_tab(&self, tab_id: TabId) -> mpsc::Receiver<TabMessage> {
        let (tx, rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);

        let mut subscribers = self.inner.tab_subscribers.write().await;
        subscribers.entry(tab_id).or_default().push(tx);

        debug!(tab = tab_id, "tab subscriber registered");
        rx
    }

    /// Get current bus statistics.
    pub async fn stats(&self) -> BusStats {
        *self.inner.stats.read().await
    }

    /// Create a lightweight handle for publishing inbound requests.
    #[must_use]
    pub fn inbound_handle(&self) -> InboundHandle {
        InboundHandle {
            tx: self.inner.inbound_tx.clone(),
        }
    }

    /// Create a lightweight handle for pushing to tabs.
    #[must_use]
    pub fn push_handle(&self) -> PushHandle {
        PushHandle { bus: self.clone() }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Lightweight handle for publishing inbound requests.
#[derive(Debug, Clone)]
pub struct InboundHandle {
    tx: mpsc::Sender<UiMessage>,
}

impl InboundHandle {
    /// Publish an inbound request.
    pub async fn publish(&self, msg: UiMessage) -> BusResult<()> {
        self.tx.send(msg).await.map_err(|_| BusError::InboundClosed)
    }
}

/// Lightweight handle for pushing to tabs.
#[derive(Debug, Clone)]
pub struct PushHandle {
    bus: MessageBus,
}

impl PushHandle {
    /// Push a message to its target tab.
    pub async fn push(&self, msg: TabMessage) {
        self.bus.push_to_tab(msg).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AnalysisUpdate, TabPush, UiRequest};

    #[tokio::test]
    async fn test_inbound_flow() {
        let bus = MessageBus::new();

        bus.publish_inbound(UiMessage::new(1, UiRequest::SessionEnd))
            .await
            .unwrap();

        let received = bus
            .consume_inbound_timeout(std::time::Duration::from_millis(100))
            .await;
        assert!(matches!(
            received.map(|m| m.request),
            Some(UiRequest::SessionEnd)
        ));
    }

    #[tokio::test]
    async fn test_push_targets_one_tab() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe_tab(1).await;

        bus.push_to_tab(TabMessage::result(1, AnalysisUpdate::insights(vec!["a".into()])))
            .await;
        bus.push_to_tab(TabMessage::error(2, "nobody listening")).await;

        let received = rx1.recv().await.unwrap();
        assert_eq!(received.tab_id, 1);
        assert!(matches!(received.push, TabPush::AnalysisResult { .. }));

        let stats = bus.stats().await;
        assert_eq!(stats.push_count, 1);
        assert_eq!(stats.dropped_count, 1);
    }

    #[tokio::test]
    async fn test_push_after_unsubscribe_is_dropped() {
        let bus = MessageBus::new();
        let rx = bus.subscribe_tab(3).await;
        drop(rx);

        bus.push_to_tab(TabMessage::error(3, "late result")).await;

        let stats = bus.stats().await;
        assert_eq!(stats.dropped_count, 1);
    }
}
