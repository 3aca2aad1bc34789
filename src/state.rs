//! Shared admission state, owned for the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use crate::identity::Identity;
use crate::limits::{AdmissionQueue, AdmissionSnapshot, RateLimiter};
use crate::tasks::TaskId;
use crate::tasks::registry::{PendingTask, TaskRegistry};

/// Capacity settings for [`CoreState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_requests: usize,
    pub rate_window: Duration,
    pub max_global: usize,
    pub max_per_identity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        use crate::consts::*;
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            rate_window: DEFAULT_RATE_WINDOW,
            max_global: DEFAULT_MAX_GLOBAL,
            max_per_identity: DEFAULT_MAX_PER_IDENTITY,
        }
    }
}

/// Rate limiter, admission queue and task registry, shared between the
/// submission path and the callback endpoint.
pub struct CoreState {
    pub rate: RateLimiter,
    pub admission: AdmissionQueue,
    pub registry: TaskRegistry,
}

impl CoreState {
    pub fn new(limits: Limits) -> Arc<Self> {
        Arc::new(Self {
            rate: RateLimiter::new(limits.max_requests, limits.rate_window),
            admission: AdmissionQueue::new(limits.max_global, limits.max_per_identity),
            registry: TaskRegistry::new(),
        })
    }

    /// Take a task out of the registry and free its admission slot. Only the
    /// first caller for an id gets the task; later ones see `None` and must
    /// not act on it.
    pub fn claim(&self, task_id: &TaskId) -> Option<PendingTask> {
        let task = self.registry.take(task_id)?;
        self.admission.release(task_id, task.identity);
        Some(task)
    }

    pub fn snapshot(&self, identity: Identity) -> AdmissionSnapshot {
        self.admission.snapshot(identity)
    }
}
