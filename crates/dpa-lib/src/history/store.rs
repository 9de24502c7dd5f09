//! Per-target history store
//!
//! Windows are created lazily on first observation and each one sits
//! behind its own lock, so cycles for different targets never contend
//! and cycles for the same target are serialized.

use super::window::{HistoryWindow, WarmupPolicy, WindowSnapshot};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Concurrency-safe map of target key -> history window
pub struct HistoryStore {
    windows: DashMap<String, Arc<Mutex<HistoryWindow>>>,
    window_len: usize,
    policy: WarmupPolicy,
}

impl HistoryStore {
    pub fn new(window_len: usize, policy: WarmupPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            window_len: window_len.max(1),
            policy,
        }
    }

    /// Get the window for a target, creating a zero-filled one if needed
    pub fn window(&self, key: &str) -> Arc<Mutex<HistoryWindow>> {
        if let Some(existing) = self.windows.get(key) {
            return existing.value().clone();
        }
        self.windows
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(target_key = %key, len = self.window_len, "Creating history window");
                Arc::new(Mutex::new(HistoryWindow::new(self.window_len, self.policy)))
            })
            .value()
            .clone()
    }

    /// Record an observation for a target and return its delta window
    pub async fn observe(&self, key: &str, current_rate: f64) -> Vec<f64> {
        let window = self.window(key);
        let mut guard = window.lock().await;
        guard.observe(current_rate)
    }

    /// Copy of a target's window, if one exists
    pub async fn snapshot(&self, key: &str) -> Option<WindowSnapshot> {
        let window = self.windows.get(key).map(|w| w.value().clone())?;
        let guard = window.lock().await;
        Some(guard.snapshot())
    }

    /// Drop the window of a target that is no longer monitored
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.windows.remove(key).is_some();
        if removed {
            debug!(target_key = %key, "Evicted history window");
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.windows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn policy(&self) -> WarmupPolicy {
        self.policy
    }
}
