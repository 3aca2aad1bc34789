use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use super::{WorkerClient, WorkerResponse, WorkerTimeout};

/// Posts jobs over HTTP with a bounded wait for the accept response.
pub struct HttpWorkerClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpWorkerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("genrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn post_job(&self, url: &str, payload: &Value) -> Result<WorkerResponse> {
        let resp = match self.client.post(url).json(payload).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Err(WorkerTimeout(self.timeout).into()),
            Err(e) if e.is_connect() => bail!("could not connect to worker: {e}"),
            Err(e) => return Err(e).context("worker request failed"),
        };

        let status = resp.status().as_u16();
        // A body we cannot read still carries a meaningful status.
        let body = resp.text().await.unwrap_or_default();
        Ok(WorkerResponse { status, body })
    }
}
