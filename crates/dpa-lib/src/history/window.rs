//! Fixed-length sliding window of rate samples and deltas

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Window length used when none is configured
pub const DEFAULT_HISTORY_LENGTH: usize = 10;

/// How a window decides that history has started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPolicy {
    /// History has started once the most recent raw sample is non-zero.
    /// A genuine zero observation therefore skips the next delta.
    #[default]
    ZeroSentinel,
    /// History has started once at least one sample has been observed
    SampleCount,
}

/// Copy of a window's contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub raw_samples: Vec<f64>,
    pub delta_samples: Vec<f64>,
    pub observed: u64,
}

/// Raw samples and their deltas for one target
///
/// Both sequences are zero-filled on creation and keep exactly `len`
/// entries forever; inserts evict the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    raw: VecDeque<f64>,
    deltas: VecDeque<f64>,
    len: usize,
    observed: u64,
    policy: WarmupPolicy,
}

impl HistoryWindow {
    pub fn new(len: usize, policy: WarmupPolicy) -> Self {
        let len = len.max(1);
        Self {
            raw: std::iter::repeat(0.0).take(len).collect(),
            deltas: std::iter::repeat(0.0).take(len).collect(),
            len,
            observed: 0,
            policy,
        }
    }

    /// Record a new rate observation and return the delta window
    pub fn observe(&mut self, current_rate: f64) -> Vec<f64> {
        if self.is_started() {
            let delta = current_rate - self.last_raw();
            push_evict(&mut self.deltas, delta, self.len);
        }
        push_evict(&mut self.raw, current_rate, self.len);
        self.observed += 1;
        self.delta_samples()
    }

    pub fn is_started(&self) -> bool {
        match self.policy {
            WarmupPolicy::ZeroSentinel => self.last_raw() != 0.0,
            WarmupPolicy::SampleCount => self.observed > 0,
        }
    }

    pub fn last_raw(&self) -> f64 {
        self.raw.back().copied().unwrap_or(0.0)
    }

    pub fn raw_samples(&self) -> Vec<f64> {
        self.raw.iter().copied().collect()
    }

    pub fn delta_samples(&self) -> Vec<f64> {
        self.deltas.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.observed == 0
    }

    /// Number of observations recorded so far
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn policy(&self) -> WarmupPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            raw_samples: self.raw_samples(),
            delta_samples: self.delta_samples(),
            observed: self.observed,
        }
    }
}

fn push_evict(buf: &mut VecDeque<f64>, value: f64, len: usize) {
    buf.push_back(value);
    while buf.len() > len {
        buf.pop_front();
    }
}
