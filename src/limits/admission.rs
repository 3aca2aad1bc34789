//! Global and per-identity in-flight accounting.
//!
//! `try_admit` and `admit` take the lock separately. On a multi-threaded
//! runtime two submissions can both pass the check before either admits,
//! so the caps can be overshot by the number of callers racing at that
//! instant.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::consts::{DEFAULT_MAX_GLOBAL, DEFAULT_MAX_PER_IDENTITY};
use crate::identity::Identity;
use crate::tasks::TaskId;

/// Why a submission was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFull {
    Global,
    PerIdentity,
}

impl QueueFull {
    pub fn reason(&self) -> &'static str {
        match self {
            QueueFull::Global => "server queue full",
            QueueFull::PerIdentity => "too many active tasks for this user",
        }
    }
}

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Point-in-time view of capacity, for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub global_count: usize,
    pub max_global: usize,
    pub identity_count: usize,
    pub max_per_identity: usize,
}

#[derive(Default)]
struct AdmissionState {
    in_flight: HashMap<TaskId, Identity>,
    per_identity: HashMap<Identity, usize>,
}

pub struct AdmissionQueue {
    max_global: usize,
    max_per_identity: usize,
    state: Mutex<AdmissionState>,
}

impl Default for AdmissionQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GLOBAL, DEFAULT_MAX_PER_IDENTITY)
    }
}

impl AdmissionQueue {
    pub fn new(max_global: usize, max_per_identity: usize) -> Self {
        Self {
            max_global,
            max_per_identity,
            state: Mutex::new(AdmissionState::default()),
        }
    }

    pub fn try_admit(&self, identity: Identity) -> Result<(), QueueFull> {
        let state = self.lock();
        if state.in_flight.len() >= self.max_global {
            return Err(QueueFull::Global);
        }
        let mine = state.per_identity.get(&identity).copied().unwrap_or(0);
        if mine >= self.max_per_identity {
            return Err(QueueFull::PerIdentity);
        }
        Ok(())
    }

    /// Take a slot. Does not re-check limits; see the module docs.
    pub fn admit(&self, task_id: TaskId, identity: Identity) {
        let mut state = self.lock();
        if let Some(previous) = state.in_flight.insert(task_id, identity) {
            // Re-admitting a live id: move its slot instead of counting twice.
            decrement(&mut state.per_identity, previous);
        }
        *state.per_identity.entry(identity).or_insert(0) += 1;
    }

    /// Give a slot back. Returns false if the task was not in flight, so the
    /// submission-failure path and the callback path can both call this.
    pub fn release(&self, task_id: &TaskId, identity: Identity) -> bool {
        let mut state = self.lock();
        let Some(owner) = state.in_flight.remove(task_id) else {
            return false;
        };
        if owner != identity {
            tracing::warn!(
                task_id = %task_id,
                %owner,
                claimed = %identity,
                "release for task owned by another identity"
            );
        }
        decrement(&mut state.per_identity, owner);
        true
    }

    pub fn snapshot(&self, identity: Identity) -> AdmissionSnapshot {
        let state = self.lock();
        AdmissionSnapshot {
            global_count: state.in_flight.len(),
            max_global: self.max_global,
            identity_count: state.per_identity.get(&identity).copied().unwrap_or(0),
            max_per_identity: self.max_per_identity,
        }
    }

    pub fn global_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn max_global(&self) -> usize {
        self.max_global
    }

    /// All in-flight tasks, sorted by owner.
    pub fn in_flight(&self) -> Vec<(TaskId, Identity)> {
        let mut tasks: Vec<_> = self
            .lock()
            .in_flight
            .iter()
            .map(|(id, who)| (id.clone(), *who))
            .collect();
        tasks.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        tasks
    }

    fn lock(&self) -> MutexGuard<'_, AdmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decrement(counts: &mut HashMap<Identity, usize>, identity: Identity) {
    if let Some(count) = counts.get_mut(&identity) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(&identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: Identity = Identity(1);
    const V: Identity = Identity(2);

    fn assert_consistent(queue: &AdmissionQueue) {
        let state = queue.lock();
        let sum: usize = state.per_identity.values().sum();
        assert_eq!(state.in_flight.len(), sum);
    }

    #[test]
    fn admit_and_release_counts() {
        let queue = AdmissionQueue::new(10, 2);
        let t1 = TaskId::from("t1");
        queue.admit(t1.clone(), U);

        let snap = queue.snapshot(U);
        assert_eq!(snap.global_count, 1);
        assert_eq!(snap.identity_count, 1);

        assert!(queue.release(&t1, U));
        let snap = queue.snapshot(U);
        assert_eq!(snap.global_count, 0);
        assert_eq!(snap.identity_count, 0);
        assert_consistent(&queue);
    }

    #[test]
    fn per_identity_limit() {
        let queue = AdmissionQueue::new(10, 1);
        assert!(queue.try_admit(U).is_ok());
        queue.admit(TaskId::from("t1"), U);

        assert_eq!(queue.try_admit(U), Err(QueueFull::PerIdentity));
        assert!(queue.try_admit(V).is_ok());
    }

    #[test]
    fn global_boundary() {
        let queue = AdmissionQueue::new(10, 1);
        for i in 0..9 {
            let who = Identity(100 + i);
            assert!(queue.try_admit(who).is_ok());
            queue.admit(TaskId::from(format!("t{i}")), who);
        }

        // tenth fits exactly
        assert!(queue.try_admit(Identity(500)).is_ok());
        queue.admit(TaskId::from("t9"), Identity(500));
        assert_eq!(queue.global_count(), 10);

        let err = queue.try_admit(Identity(501)).unwrap_err();
        assert_eq!(err, QueueFull::Global);
        assert_eq!(err.to_string(), "server queue full");
        assert_eq!(queue.try_admit(U), Err(QueueFull::Global));
    }

    #[test]
    fn global_reason_wins_over_per_identity() {
        let queue = AdmissionQueue::new(1, 1);
        queue.admit(TaskId::from("t1"), U);
        assert_eq!(queue.try_admit(U), Err(QueueFull::Global));
    }

    #[test]
    fn double_release_is_noop() {
        let queue = AdmissionQueue::new(10, 3);
        let t1 = TaskId::from("t1");
        queue.admit(t1.clone(), U);
        queue.admit(TaskId::from("t2"), U);

        assert!(queue.release(&t1, U));
        let once = queue.snapshot(U);
        assert!(!queue.release(&t1, U));
        assert_eq!(queue.snapshot(U), once);
        assert_eq!(once.identity_count, 1);
        assert_consistent(&queue);
    }

    #[test]
    fn release_unknown_is_noop() {
        let queue = AdmissionQueue::new(10, 1);
        queue.admit(TaskId::from("t1"), U);
        assert!(!queue.release(&TaskId::from("never"), U));
        assert_eq!(queue.snapshot(U).identity_count, 1);
        assert_consistent(&queue);
    }

    #[test]
    fn release_with_wrong_identity_frees_owner() {
        let queue = AdmissionQueue::new(10, 1);
        let t1 = TaskId::from("t1");
        queue.admit(t1.clone(), U);

        assert!(queue.release(&t1, V));
        assert_eq!(queue.snapshot(U).identity_count, 0);
        assert_eq!(queue.snapshot(V).identity_count, 0);
        assert_consistent(&queue);
    }

    #[test]
    fn readmitting_same_id_does_not_double_count() {
        let queue = AdmissionQueue::new(10, 5);
        let t1 = TaskId::from("t1");
        queue.admit(t1.clone(), U);
        queue.admit(t1.clone(), U);
        assert_eq!(queue.snapshot(U).identity_count, 1);
        assert_consistent(&queue);
    }

    #[test]
    fn invariant_holds_over_mixed_sequence() {
        let queue = AdmissionQueue::new(10, 3);
        let ids: Vec<TaskId> = (0..6).map(|i| TaskId::from(format!("t{i}"))).collect();
        for (i, id) in ids.iter().enumerate() {
            let who = if i % 2 == 0 { U } else { V };
            if queue.try_admit(who).is_ok() {
                queue.admit(id.clone(), who);
            }
            assert_consistent(&queue);
        }
        for id in ids.iter().rev() {
            queue.release(id, U);
            queue.release(id, U);
            assert_consistent(&queue);
        }
        assert_eq!(queue.global_count(), 0);
    }

    #[test]
    fn in_flight_lists_tasks() {
        let queue = AdmissionQueue::new(10, 2);
        queue.admit(TaskId::from("b"), V);
        queue.admit(TaskId::from("a"), U);
        let list = queue.in_flight();
        assert_eq!(list, vec![(TaskId::from("a"), U), (TaskId::from("b"), V)]);
    }
}
