//! Completion callbacks from the worker.
//!
//! The worker only needs to hear that we got the message. Business outcomes
//! (unknown task, failed job, undeliverable result) are all answered with
//! 200; the only non-200 is "not ready yet". Video decoding happens on the
//! delivery side, after the response.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::delivery::{Completion, NO_VIDEO};
use crate::tasks::TaskId;

use super::AppState;

const DEFAULT_FAILURE: &str = "generation failed";

/// Body the worker posts when a task finishes.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    pub task_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub video_base64: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl CallbackPayload {
    /// Turn the worker's report into what goes on the delivery queue.
    pub fn into_completion(self, task_id: TaskId) -> Completion {
        if self.status != "success" {
            let detail = self
                .error
                .or(self.detail)
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE.to_string());
            return Completion::Failed { task_id, detail };
        }

        match self.video_base64.filter(|v| !v.trim().is_empty()) {
            Some(video_base64) => Completion::Video {
                task_id,
                video_base64,
            },
            None => Completion::Failed {
                task_id,
                detail: NO_VIDEO.to_string(),
            },
        }
    }
}

pub async fn handle_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> (StatusCode, Json<Value>) {
    let Some(ctx) = state.context() else {
        tracing::error!(task_id = %payload.task_id, "callback received before core was ready");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "detail": "not ready" })),
        );
    };

    let task_id = TaskId::from(payload.task_id.clone());
    // Claiming removes the task, so duplicates that race this one see None.
    let Some(task) = ctx.core.claim(&task_id) else {
        tracing::warn!(%task_id, status = %payload.status, "callback for unknown task, ignoring");
        return (
            StatusCode::OK,
            Json(json!({ "status": "ignored", "task_id": task_id })),
        );
    };

    let identity = task.identity;
    tracing::info!(
        %identity,
        %task_id,
        kind = %task.kind,
        status = %payload.status,
        "callback received"
    );
    ctx.deliveries
        .send(identity, payload.into_completion(task_id.clone()));

    (
        StatusCode::OK,
        Json(json!({ "status": "received", "task_id": task_id })),
    )
}
