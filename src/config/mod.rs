//! Runtime settings. Built from CLI flags / environment in `main.rs`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::consts::{CALLBACK_PATH, DEFAULT_SUBMIT_TIMEOUT};
use crate::identity::Identity;
use crate::state::Limits;
use crate::submit::SubmitterConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the generation worker.
    pub worker_url: String,
    /// Publicly reachable base URL of this process.
    pub public_url: String,
    /// Where the callback listener binds.
    pub bind: SocketAddr,
    pub limits: Limits,
    pub submit_timeout: Duration,
    /// The one identity allowed to see global status.
    pub admin: Identity,
    /// Expire pending tasks after this long. `None` keeps them forever.
    pub pending_ttl: Option<Duration>,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_url: "http://127.0.0.1:8000".to_string(),
            public_url: "http://127.0.0.1:8080".to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            limits: Limits::default(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            admin: Identity(0),
            pending_ttl: None,
            output_dir: PathBuf::from("videos"),
        }
    }
}

impl Settings {
    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("worker url", &self.worker_url), ("public url", &self.public_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{name} must start with http:// or https://, got '{url}'");
            }
        }
        if self.limits.max_global == 0 {
            bail!("max global tasks must be at least 1");
        }
        if self.limits.max_per_identity == 0 {
            bail!("max tasks per user must be at least 1");
        }
        if self.limits.rate_window.is_zero() {
            bail!("rate window must be positive");
        }
        if self.submit_timeout.is_zero() {
            bail!("submit timeout must be positive");
        }
        if let Some(ttl) = self.pending_ttl
            && ttl.is_zero()
        {
            bail!("pending ttl must be positive");
        }
        Ok(())
    }

    /// Full URL the worker should post results to.
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), CALLBACK_PATH)
    }

    pub fn submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            worker_url: self.worker_url.clone(),
            callback_url: self.callback_url(),
        }
    }

    pub fn is_admin(&self, identity: Identity) -> bool {
        identity == self.admin
    }
}
