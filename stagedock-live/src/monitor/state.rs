//! Per-creator live state used for transition detection.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Edge reported by [`TransitionTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No edge.
    Unchanged,
    /// Offline (or never observed) to live. `suppressed` is set while the
    /// first tick after a start is running.
    WentLive { suppressed: bool },
    /// Live to offline.
    WentOffline,
}

/// Last observed live flag per creator, plus the startup suppression window.
///
/// Only statuses that were actually fetched are observed, so an unavailable
/// fetch never moves a creator's state.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    previous: DashMap<String, bool>,
    /// Generation that armed the current suppression window, 0 when open.
    suppression: AtomicU64,
    generation: AtomicU64,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm suppression. Returns the token needed to lift it again.
    pub fn suppress(&self) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.suppression.store(token, Ordering::SeqCst);
        token
    }

    /// Lift suppression armed with `token`. A stale token is ignored so a
    /// loop finishing after a restart cannot open the new window early.
    pub fn release(&self, token: u64) -> bool {
        self.suppression
            .compare_exchange(token, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppression.load(Ordering::SeqCst) != 0
    }

    /// Record the latest live flag for a creator and report the edge.
    pub fn observe(&self, creator_id: &str, is_live: bool) -> Transition {
        let previous = self.previous.insert(creator_id.to_string(), is_live);

        match (previous, is_live) {
            (Some(true), true) => Transition::Unchanged,
            (_, true) => Transition::WentLive {
                suppressed: self.is_suppressed(),
            },
            (Some(true), false) => Transition::WentOffline,
            (_, false) => Transition::Unchanged,
        }
    }

    pub fn previous(&self, creator_id: &str) -> Option<bool> {
        self.previous.get(creator_id).map(|entry| *entry)
    }

    /// Drop a creator's state, e.g. after it was untracked.
    pub fn forget(&self, creator_id: &str) -> Option<bool> {
        self.previous.remove(creator_id).map(|(_, live)| live)
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
