use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use genrelay::banner::{BannerInfo, print_banner, print_session_summary};
use genrelay::commands::{CommandRegistry, Session};
use genrelay::config::Settings;
use genrelay::console::{ConsoleRecipient, run_repl};
use genrelay::consts::{
    DEFAULT_MAX_GLOBAL, DEFAULT_MAX_PER_IDENTITY, DEFAULT_MAX_REQUESTS, DEFAULT_RATE_WINDOW,
    DEFAULT_SUBMIT_TIMEOUT,
};
use genrelay::delivery::{DeliveryQueue, run_deliveries};
use genrelay::identity::Identity;
use genrelay::server::{self, AppState};
use genrelay::state::{CoreState, Limits};
use genrelay::submit::JobSubmitter;
use genrelay::tasks::sweep::Sweeper;
use genrelay::worker::http::HttpWorkerClient;

#[derive(Parser)]
#[command(name = "genrelay", version, about = "Queue video generation jobs and relay the results.")]
struct Cli {
    /// Base URL of the generation worker
    #[arg(long, env = "WORKER_URL", default_value = "http://127.0.0.1:8000")]
    worker_url: String,

    /// Publicly reachable base URL of this process (the worker calls back here)
    #[arg(long, env = "PUBLIC_URL", default_value = "http://127.0.0.1:8080")]
    public_url: String,

    /// Address the callback listener binds to
    #[arg(short, long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// The admin identity
    #[arg(long, env = "ADMIN_ID", default_value_t = 0)]
    admin_id: i64,

    /// Identity used by the console front-end
    #[arg(short, long, env = "USER_ID", default_value_t = 1)]
    user: i64,

    /// Submissions allowed per user within the rate window
    #[arg(long, env = "MAX_REQUESTS", default_value_t = DEFAULT_MAX_REQUESTS)]
    max_requests: usize,

    /// Rate window in seconds
    #[arg(long, env = "RATE_WINDOW_SECS", default_value_t = DEFAULT_RATE_WINDOW.as_secs())]
    rate_window_secs: u64,

    /// Tasks in flight across all users
    #[arg(long, env = "MAX_GLOBAL_TASKS", default_value_t = DEFAULT_MAX_GLOBAL)]
    max_global: usize,

    /// Tasks in flight per user
    #[arg(long, env = "MAX_USER_TASKS", default_value_t = DEFAULT_MAX_PER_IDENTITY)]
    max_per_user: usize,

    /// Seconds to wait for the worker to accept a job
    #[arg(short, long, env = "SUBMIT_TIMEOUT_SECS", default_value_t = DEFAULT_SUBMIT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Expire tasks with no callback after this many seconds (default: never)
    #[arg(long, env = "PENDING_TTL_SECS")]
    pending_ttl_secs: Option<u64>,

    /// Directory delivered videos are written to
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "videos")]
    output_dir: PathBuf,

    /// Run only the callback listener, without the console
    #[arg(long, default_value_t = false)]
    headless: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            worker_url: self.worker_url.clone(),
            public_url: self.public_url.clone(),
            bind: self.bind,
            limits: Limits {
                max_requests: self.max_requests,
                rate_window: Duration::from_secs(self.rate_window_secs),
                max_global: self.max_global,
                max_per_identity: self.max_per_user,
            },
            submit_timeout: Duration::from_secs(self.timeout),
            admin: Identity(self.admin_id),
            pending_ttl: self.pending_ttl_secs.map(Duration::from_secs),
            output_dir: self.output_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    settings.validate().context("invalid configuration")?;

    // Listener first: callbacks arriving before the core is wired get a 503.
    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    let app_state = AppState::new();
    let server = tokio::spawn(server::serve(listener, app_state.clone()));

    let core = CoreState::new(settings.limits);
    let (deliveries, delivery_rx) = DeliveryQueue::channel();
    app_state.install(core.clone(), deliveries.clone());

    let recipient = Arc::new(ConsoleRecipient::new(settings.output_dir.clone()));
    tokio::spawn(run_deliveries(delivery_rx, recipient));

    if let Some(ttl) = settings.pending_ttl {
        tracing::info!(ttl_secs = ttl.as_secs(), "pending-task sweep enabled");
        let every = (ttl / 4).max(Duration::from_secs(1));
        Sweeper::new(core.clone(), deliveries.clone(), ttl).spawn(every);
    }

    let worker = Arc::new(HttpWorkerClient::new(settings.submit_timeout)?);
    let submitter = Arc::new(JobSubmitter::new(
        core.clone(),
        worker,
        settings.submitter_config(),
    ));

    let identity = Identity(cli.user);
    let callback_url = settings.callback_url();
    let output_dir = settings.output_dir.display().to_string();
    print_banner(&BannerInfo {
        identity,
        admin: settings.is_admin(identity),
        worker_url: &settings.worker_url,
        callback_url: &callback_url,
        bind: settings.bind,
        limits: settings.limits,
        output_dir: &output_dir,
    });

    if cli.headless {
        tokio::select! {
            result = server => result.context("callback server panicked")??,
            _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
        }
        return Ok(());
    }

    let session = Session::new(identity, settings.is_admin(identity), submitter);
    let registry = CommandRegistry::new();
    run_repl(&registry, &session).await?;

    print_session_summary(core.snapshot(identity));
    Ok(())
}
