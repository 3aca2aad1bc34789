//! Who asked for what. The only place a task id is mapped back to a user.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::identity::Identity;
use crate::job::JobKind;

use super::TaskId;

/// A submitted task awaiting its completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    pub identity: Identity,
    pub kind: JobKind,
    pub submitted_at: Instant,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, PendingTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, task_id: TaskId, identity: Identity, kind: JobKind) {
        self.register_at(task_id, identity, kind, Instant::now());
    }

    pub fn register_at(&self, task_id: TaskId, identity: Identity, kind: JobKind, now: Instant) {
        let previous = self.lock().insert(
            task_id.clone(),
            PendingTask {
                identity,
                kind,
                submitted_at: now,
            },
        );
        if previous.is_some() {
            tracing::warn!(task_id = %task_id, "task id registered twice, replacing");
        }
    }

    /// The identity that owns `task_id`, or `None` for unknown/forgotten ids.
    pub fn resolve(&self, task_id: &TaskId) -> Option<Identity> {
        self.lock().get(task_id).map(|t| t.identity)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<PendingTask> {
        self.lock().get(task_id).cloned()
    }

    /// Remove and return a task in one step. When several callers race for
    /// the same id, exactly one gets `Some`.
    pub fn take(&self, task_id: &TaskId) -> Option<PendingTask> {
        self.lock().remove(task_id)
    }

    /// Remove a task. Returns false if it was not registered.
    pub fn forget(&self, task_id: &TaskId) -> bool {
        self.take(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Tasks pending for at least `ttl` as of `now`.
    pub fn expired(&self, ttl: Duration, now: Instant) -> Vec<(TaskId, Identity)> {
        self.lock()
            .iter()
            .filter(|(_, t)| now.saturating_duration_since(t.submitted_at) >= ttl)
            .map(|(id, t)| (id.clone(), t.identity))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, PendingTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
