use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::types::StatsSnapshot;

/// State shared by the controllers and the AI bridge for one page.
///
/// Built once and handed to every consumer at construction. The stats
/// snapshot is write-once per session: the first successful fetch for a
/// session wins and later fetches for it read it back unchanged. Switching
/// to another session drops the snapshot.
#[derive(Debug, Default)]
pub struct SessionContext {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    session_id: Option<String>,
    /// Snapshot and the session it was fetched for.
    stats: Option<(String, Arc<StatsSnapshot>)>,
}

impl Inner {
    fn held_for(&self, session_id: &str) -> Option<Arc<StatsSnapshot>> {
        match &self.stats {
            Some((owner, snapshot)) if owner == session_id => Some(snapshot.clone()),
            _ => None,
        }
    }
}

impl SessionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_session(&self, session_id: &str) {
        let mut inner = self.lock();
        if inner.held_for(session_id).is_none() {
            inner.stats = None;
        }
        inner.session_id = Some(session_id.to_string());
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    /// Store the snapshot for `session_id` unless one is already held for
    /// that session; return the held one.
    pub fn record_stats(&self, session_id: &str, snapshot: StatsSnapshot) -> Arc<StatsSnapshot> {
        let mut inner = self.lock();
        if let Some(held) = inner.held_for(session_id) {
            return held;
        }
        let snapshot = Arc::new(snapshot);
        inner.stats = Some((session_id.to_string(), snapshot.clone()));
        snapshot
    }

    /// Snapshot of the current session. Before any session is recorded the
    /// last stored snapshot is returned.
    pub fn stats(&self) -> Option<Arc<StatsSnapshot>> {
        let inner = self.lock();
        match &inner.session_id {
            Some(current) => inner.held_for(current),
            None => inner.stats.as_ref().map(|(_, s)| s.clone()),
        }
    }
}
