//! Expiry for tasks whose callback never arrives.
//!
//! Without a sweep a lost callback holds its admission slot and registry
//! entry until the process exits. Off by default.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::delivery::{Completion, DeliveryQueue};
use crate::state::CoreState;

pub const EXPIRED_DETAIL: &str = "timed out waiting for the generation service";

pub struct Sweeper {
    core: Arc<CoreState>,
    deliveries: DeliveryQueue,
    ttl: Duration,
}

impl Sweeper {
    pub fn new(core: Arc<CoreState>, deliveries: DeliveryQueue, ttl: Duration) -> Self {
        Self {
            core,
            deliveries,
            ttl,
        }
    }

    /// Expire everything pending for at least the TTL. Returns how many were
    /// expired here; a task whose callback claims it first is skipped.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut swept = 0;
        for (task_id, _) in self.core.registry.expired(self.ttl, now) {
            let Some(task) = self.core.claim(&task_id) else {
                continue;
            };
            tracing::warn!(
                identity = %task.identity,
                %task_id,
                ttl_secs = self.ttl.as_secs(),
                "pending task expired"
            );
            self.deliveries.send(
                task.identity,
                Completion::Failed {
                    task_id,
                    detail: EXPIRED_DETAIL.to_string(),
                },
            );
            swept += 1;
        }
        swept
    }

    /// Run [`sweep`](Self::sweep) every `every` until the runtime shuts down.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep(Instant::now());
            }
        })
    }
}
