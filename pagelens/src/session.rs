//! Per-tab, per-mode session registry.
//!
//! A session scopes a sequence of question-answering interactions, and the
//! remote content cache they populate, to one tab and one Lumen mode. The
//! registry is the only owner of the tab→session mapping: at most one live
//! session exists per `(tab, mode)` pair, every allocated identifier is
//! eventually torn down by an explicit event (mode toggle, tab close,
//! explicit end), and remote teardown is best-effort; a failure leaves
//! orphaned cache entries but never blocks a local state transition.
//!
//! Allocation is synchronous: the map lives behind a non-async mutex and
//! `get_or_create` has no suspension point between check and set, so
//! concurrent handlers cannot double-allocate a pair.

use crate::events::TabId;
use crate::util::{next_seq, timestamp_ms};
use crate::workers::WorkerApi;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Analysis mode: whether the retrieval-augmented Lumen feature is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Lumen retrieval is active.
    On,
    /// Plain page-analysis mode.
    Off,
}

impl Mode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Mode selected by the Lumen toggle state.
    #[must_use]
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }

    /// The opposite mode.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

/// Session slots for one tab.
#[derive(Debug, Clone, Default)]
struct ModeSlots {
    on: Option<String>,
    off: Option<String>,
}

impl ModeSlots {
    fn slot(&self, mode: Mode) -> &Option<String> {
        match mode {
            Mode::On => &self.on,
            Mode::Off => &self.off,
        }
    }

    fn slot_mut(&mut self, mode: Mode) -> &mut Option<String> {
        match mode {
            Mode::On => &mut self.on,
            Mode::Off => &mut self.off,
        }
    }

    fn into_sessions(self) -> Vec<String> {
        [self.on, self.off].into_iter().flatten().collect()
    }
}

/// Registry owning the tab→session mapping and remote teardown.
pub struct SessionRegistry {
    workers: Arc<dyn WorkerApi>,
    tabs: Mutex<HashMap<TabId, ModeSlots>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Create a registry backed by the given worker client.
    #[must_use]
    pub fn new(workers: Arc<dyn WorkerApi>) -> Self {
        Self {
            workers,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TabId, ModeSlots>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gen_session_id(tab_id: TabId, mode: Mode) -> String {
        format!(
            "session_{tab_id}_{}_{}_{}",
            mode.as_str(),
            timestamp_ms(),
            next_seq()
        )
    }

    /// Return the existing session for `(tab, mode)`, allocating one if
    /// absent. Idempotent: repeated calls return the same identifier
    /// until a toggle or teardown replaces it.
    pub fn get_or_create(&self, tab_id: TabId, mode: Mode) -> String {
        let mut tabs = self.lock();
        let slot = tabs.entry(tab_id).or_default().slot_mut(mode);
        if let Some(existing) = slot {
            return existing.clone();
        }
        let session_id = Self::gen_session_id(tab_id, mode);
        debug!(tab = tab_id, mode = mode.as_str(), session = %session_id, "created session");
        *slot = Some(session_id.clone());
        session_id
    }

    /// Peek at the live session for `(tab, mode)` without allocating.
    #[must_use]
    pub fn session_for(&self, tab_id: TabId, mode: Mode) -> Option<String> {
        self.lock().get(&tab_id).and_then(|s| s.slot(mode).clone())
    }

    /// Number of tabs with at least one live session.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.lock().len()
    }

    /// Handle a Lumen toggle: tear down the old-mode session and allocate
    /// a fresh one for the new mode.
    ///
    /// The new-mode slot is replaced unconditionally; a session displaced
    /// that way is torn down too, so no identifier is orphaned. Teardown
    /// runs detached and this never fails visibly to the caller.
    pub fn toggle_mode(&self, tab_id: TabId, enabling: bool) {
        let new_mode = Mode::from_enabled(enabling);
        let old_mode = new_mode.other();
        let fresh = Self::gen_session_id(tab_id, new_mode);

        let (old, displaced) = {
            let mut tabs = self.lock();
            let slots = tabs.entry(tab_id).or_default();
            let old = slots.slot_mut(old_mode).take();
            let displaced = slots.slot_mut(new_mode).replace(fresh.clone());
            (old, displaced)
        };

        info!(
            tab = tab_id,
            enabled = enabling,
            session = %fresh,
            "lumen toggled, fresh session allocated"
        );

        for session_id in [old, displaced].into_iter().flatten() {
            self.spawn_teardown(session_id);
        }
    }

    /// End every session for a tab: remove the local entry, then issue
    /// remote teardown for each live slot concurrently, awaiting all of
    /// them regardless of individual outcome.
    ///
    /// Returns the number of cleared slots. Safe and silent when the tab
    /// has no entry; idempotent because the entry is taken up front.
    pub async fn end_session(&self, tab_id: TabId) -> usize {
        let sessions = match self.lock().remove(&tab_id) {
            Some(slots) => slots.into_sessions(),
            None => return 0,
        };

        let count = sessions.len();
        join_all(
            sessions
                .iter()
                .map(|sid| clear_on_server(self.workers.as_ref(), sid)),
        )
        .await;

        info!(tab = tab_id, cleared = count, "session ended");
        count
    }

    /// Tab-lifecycle hook: same semantics as [`Self::end_session`].
    pub async fn on_tab_closed(&self, tab_id: TabId) {
        let cleared = self.end_session(tab_id).await;
        if cleared > 0 {
            debug!(tab = tab_id, cleared, "tab closed, sessions cleared");
        }
    }

    /// Fire-and-forget remote teardown of one session.
    fn spawn_teardown(&self, session_id: String) {
        let workers = Arc::clone(&self.workers);
        tokio::spawn(async move {
            clear_on_server(workers.as_ref(), &session_id).await;
        });
    }
}

/// Best-effort remote teardown. Failures are logged, never propagated.
async fn clear_on_server(workers: &dyn WorkerApi, session_id: &str) {
    match workers.clear_session(session_id).await {
        Ok(report) => {
            if report.deleted > 0 {
                info!(session = session_id, deleted = report.deleted, "cleaned remote content cache");
            }
        }
        Err(e) => {
            warn!(session = session_id, error = %e, "session teardown failed");
        }
    }
}
