use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::{WorkerClient, WorkerResponse};

/// A scripted worker for tests. Replies with pre-defined responses in
/// order and records every request it sees.
pub struct MockWorkerClient {
    replies: Mutex<VecDeque<Result<WorkerResponse>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockWorkerClient {
    pub fn new(replies: Vec<Result<WorkerResponse>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A worker that accepts every job.
    pub fn accepting(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|_| {
                    Ok(WorkerResponse {
                        status: 200,
                        body: r#"{"status":"queued"}"#.to_string(),
                    })
                })
                .collect(),
        )
    }

    /// Requests received so far, as `(url, payload)`.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WorkerClient for MockWorkerClient {
    async fn post_job(&self, url: &str, payload: &Value) -> Result<WorkerResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), payload.clone()));

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(anyhow::anyhow!(
                    "MockWorkerClient: no more replies (called {call} times)"
                ))
            })
    }
}
