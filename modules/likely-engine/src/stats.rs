use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Outcome and contention counters for the toggle engine.
#[derive(Debug, Default)]
pub struct ToggleStats {
    accepted: AtomicU64,
    conflicts: AtomicU64,
    self_actions: AtomicU64,
    not_found: AtomicU64,
    storage_errors: AtomicU64,
    cas_attempts: AtomicU64,
    cas_retries: AtomicU64,
    cas_exhausted: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub conflicts: u64,
    pub self_actions: u64,
    pub not_found: u64,
    pub storage_errors: u64,
    pub cas_attempts: u64,
    pub cas_retries: u64,
    pub cas_exhausted: u64,
}

impl ToggleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_self_action(&self) {
        self.self_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cas_attempt(&self, attempt: usize) {
        self.cas_attempts.fetch_add(1, Ordering::Relaxed);
        if attempt > 0 {
            self.cas_retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_cas_exhausted(&self) {
        self.cas_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            self_actions: self.self_actions.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
            cas_attempts: self.cas_attempts.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
            cas_exhausted: self.cas_exhausted.load(Ordering::Relaxed),
        }
    }
}
