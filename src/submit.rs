//! Job submission: admission, payload assembly, and the worker round trip.

use std::sync::Arc;
use std::time::Duration;

use crate::consts::{MAX_ERROR_BODY_CHARS, format_wait, truncate_chars};
use crate::identity::Identity;
use crate::job::JobSpec;
use crate::limits::QueueFull;
use crate::state::CoreState;
use crate::tasks::TaskId;
use crate::worker::{WorkerClient, WorkerTimeout};

/// How a submission ended. Business outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The worker took the job; a callback will follow.
    Accepted(TaskId),
    /// Too many submissions in the window. Wait this long.
    RateLimited(Duration),
    QueueFull(QueueFull),
    /// The worker answered with something other than 200.
    RemoteRejected { status: u16, body: String },
    /// No HTTP answer at all. `timeout` is set when the submit timeout
    /// expired, as opposed to a connect or transport failure.
    NetworkError { timeout: bool, detail: String },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }

    /// Plain-text notice for the user.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionOutcome::Accepted(_) => {
                "Processing... this may take 1-3 minutes. The video will be sent when ready."
                    .to_string()
            }
            SubmissionOutcome::RateLimited(wait) => {
                format!("Rate limit reached. Try again in {}.", format_wait(*wait))
            }
            SubmissionOutcome::QueueFull(reason) => format!("Cannot start now: {reason}."),
            SubmissionOutcome::RemoteRejected { status, body } => {
                format!("Error generating video\nStatus: {status}\nError: {body}")
            }
            SubmissionOutcome::NetworkError { timeout: true, .. } => {
                "Request timeout. Please try again.".to_string()
            }
            SubmissionOutcome::NetworkError { timeout: false, .. } => {
                "Could not reach the generation service. Please try again.".to_string()
            }
        }
    }
}

/// Where the worker lives and where it should call back.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Base URL; job endpoints are appended.
    pub worker_url: String,
    /// Full public URL of our callback endpoint.
    pub callback_url: String,
}

pub struct JobSubmitter {
    core: Arc<CoreState>,
    worker: Arc<dyn WorkerClient>,
    config: SubmitterConfig,
}

impl JobSubmitter {
    pub fn new(core: Arc<CoreState>, worker: Arc<dyn WorkerClient>, config: SubmitterConfig) -> Self {
        Self {
            core,
            worker,
            config,
        }
    }

    pub fn core(&self) -> &Arc<CoreState> {
        &self.core
    }

    pub fn endpoint_for(&self, spec: &JobSpec) -> String {
        format!(
            "{}{}",
            self.config.worker_url.trim_end_matches('/'),
            spec.kind().endpoint()
        )
    }

    pub async fn submit(&self, identity: Identity, spec: JobSpec) -> SubmissionOutcome {
        let decision = self.core.rate.allowed(identity);
        if !decision.allowed {
            let wait = decision.retry_after.unwrap_or_default();
            tracing::info!(%identity, wait_secs = wait.as_secs(), "submission rate limited");
            return SubmissionOutcome::RateLimited(wait);
        }

        if let Err(full) = self.core.admission.try_admit(identity) {
            tracing::info!(%identity, reason = %full, "submission refused");
            return SubmissionOutcome::QueueFull(full);
        }

        // Slots are held across the worker call.
        let task_id = TaskId::generate();
        self.core
            .registry
            .register(task_id.clone(), identity, spec.kind());
        self.core.admission.admit(task_id.clone(), identity);
        self.core.rate.record(identity);

        let url = self.endpoint_for(&spec);
        let payload = spec.payload(&self.config.callback_url, task_id.as_str());
        tracing::info!(%identity, %task_id, kind = %spec.kind(), %url, "submitting job");

        match self.worker.post_job(&url, &payload).await {
            Ok(resp) if resp.accepted() => {
                tracing::info!(%identity, %task_id, "job accepted by worker");
                SubmissionOutcome::Accepted(task_id)
            }
            Ok(resp) => {
                self.core.claim(&task_id);
                tracing::warn!(%identity, %task_id, status = resp.status, "worker rejected job");
                SubmissionOutcome::RemoteRejected {
                    status: resp.status,
                    body: truncate_chars(&resp.body, MAX_ERROR_BODY_CHARS),
                }
            }
            Err(e) => {
                self.core.claim(&task_id);
                let timeout = e.downcast_ref::<WorkerTimeout>().is_some();
                tracing::warn!(%identity, %task_id, timeout, error = %e, "job submission failed");
                SubmissionOutcome::NetworkError {
                    timeout,
                    detail: format!("{e:#}"),
                }
            }
        }
    }
}
