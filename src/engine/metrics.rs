//! Engine-wide counters. Not part of the core decision
//! contract — an implementation MAY expose these, and nothing in `check`'s
//! semantics depends on them.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    total_checks: AtomicU64,
    total_actions: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    evaluation_errors: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_check(&self) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_action(&self, allowed: bool, errored: bool) {
        self.total_actions.fetch_add(1, Ordering::Relaxed);
        if errored {
            self.evaluation_errors.fetch_add(1, Ordering::Relaxed);
        }
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_checks(&self) -> u64 {
        self.total_checks.load(Ordering::Relaxed)
    }

    pub fn total_actions(&self) -> u64 {
        self.total_actions.load(Ordering::Relaxed)
    }

    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn denied(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    pub fn evaluation_errors(&self) -> u64 {
        self.evaluation_errors.load(Ordering::Relaxed)
    }

    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed() + self.denied();
        if total == 0 {
            0.0
        } else {
            self.allowed() as f64 / total as f64
        }
    }
}
