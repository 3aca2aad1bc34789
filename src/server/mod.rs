//! HTTP listener for worker callbacks and liveness checks.
//!
//! The listener can start before the rest of the core is wired; until
//! [`AppState::install`] is called, callbacks get a 503.

pub mod callback;

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::consts::{CALLBACK_PATH, HEALTH_PATH, MAX_CALLBACK_BYTES};
use crate::delivery::DeliveryQueue;
use crate::state::CoreState;

/// What the callback endpoint needs once the core is running.
pub struct CallbackContext {
    pub core: Arc<CoreState>,
    pub deliveries: DeliveryQueue,
}

#[derive(Clone, Default)]
pub struct AppState {
    ready: Arc<OnceLock<CallbackContext>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state that is ready immediately.
    pub fn ready(core: Arc<CoreState>, deliveries: DeliveryQueue) -> Self {
        let state = Self::new();
        state.install(core, deliveries);
        state
    }

    /// Wire in the core. Returns false if it was already installed.
    pub fn install(&self, core: Arc<CoreState>, deliveries: DeliveryQueue) -> bool {
        self.ready.set(CallbackContext { core, deliveries }).is_ok()
    }

    pub fn context(&self) -> Option<&CallbackContext> {
        self.ready.get()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            CALLBACK_PATH,
            post(callback::handle_callback).layer(DefaultBodyLimit::max(MAX_CALLBACK_BYTES)),
        )
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Serve until the listener fails or the task is dropped.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%addr, "callback server listening");
    axum::serve(listener, router(state))
        .await
        .context("callback server stopped")
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    match state.context() {
        Some(ctx) => Json(json!({
            "status": "ok",
            "in_flight": ctx.core.admission.global_count(),
            "max_global": ctx.core.admission.max_global(),
            "pending": ctx.core.registry.len(),
        })),
        None => Json(json!({ "status": "starting" })),
    }
}
