pub mod http;
pub mod mock;

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The worker's synchronous answer to a job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    pub status: u16,
    pub body: String,
}

impl WorkerResponse {
    /// Only a plain 200 means the worker took the job.
    pub fn accepted(&self) -> bool {
        self.status == 200
    }
}

/// The worker did not answer within the submit timeout. Returned inside
/// `anyhow::Error`; callers find it with `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTimeout(pub Duration);

impl fmt::Display for WorkerTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out after {}s", self.0.as_secs())
    }
}

impl std::error::Error for WorkerTimeout {}

/// Transport to the remote generation worker. `Err` means the request never
/// got an HTTP answer (connect failure, timeout).
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn post_job(&self, url: &str, payload: &Value) -> Result<WorkerResponse>;
}
