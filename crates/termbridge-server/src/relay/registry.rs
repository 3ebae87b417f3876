//! Viewer registry.
//!
//! Tracks which viewers are attached to which session. Entries are advisory:
//! the relay loop never reads them, and removing one never touches the
//! backend session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

/// One attached viewer.
#[derive(Debug, Clone)]
pub struct ViewerEntry {
    /// Registry-assigned id, unique for the process lifetime.
    pub viewer_id: u64,
    /// Remote address, when the viewer came in over the network.
    pub remote_addr: Option<SocketAddr>,
    /// When the viewer attached.
    pub attached_at: Instant,
}

/// Registry of viewers, grouped by session name.
#[derive(Clone, Default)]
pub struct ViewerRegistry {
    viewers: Arc<RwLock<HashMap<String, HashMap<u64, ViewerEntry>>>>,
    next_id: Arc<AtomicU64>,
}

impl ViewerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a viewer attaching to `session`. Returns its id.
    pub async fn register(&self, session: &str, remote_addr: Option<SocketAddr>) -> u64 {
        let viewer_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = ViewerEntry {
            viewer_id,
            remote_addr,
            attached_at: Instant::now(),
        };

        let mut viewers = self.viewers.write().await;
        viewers
            .entry(session.to_string())
            .or_default()
            .insert(viewer_id, entry);

        debug!(session, viewer_id, "viewer registered");
        viewer_id
    }

    /// Remove a viewer. Sessions with no remaining viewers are dropped.
    pub async fn unregister(&self, session: &str, viewer_id: u64) {
        let mut viewers = self.viewers.write().await;
        if let Some(set) = viewers.get_mut(session) {
            if set.remove(&viewer_id).is_some() {
                debug!(session, viewer_id, "viewer unregistered");
            }
            if set.is_empty() {
                viewers.remove(session);
            }
        }
    }

    /// Number of viewers attached to `session`.
    pub async fn count(&self, session: &str) -> usize {
        self.viewers
            .read()
            .await
            .get(session)
            .map_or(0, HashMap::len)
    }

    /// Viewer count per session that has at least one viewer.
    pub async fn sessions(&self) -> Vec<(String, usize)> {
        let viewers = self.viewers.read().await;
        let mut out: Vec<_> = viewers
            .iter()
            .map(|(name, set)| (name.clone(), set.len()))
            .collect();
        out.sort();
        out
    }

    /// All viewers attached to `session`.
    pub async fn list(&self, session: &str) -> Vec<ViewerEntry> {
        let viewers = self.viewers.read().await;
        let mut out: Vec<_> = viewers
            .get(session)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        out.sort_by_key(|e| e.viewer_id);
        out
    }
}
