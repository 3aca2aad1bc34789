//! Hand-off of finished work from the callback endpoint to the front-end.
//!
//! The HTTP handler pushes a [`Completion`] onto [`DeliveryQueue`] and
//! returns immediately. A single consumer ([`run_deliveries`]) drains the
//! channel and spawns each item as its own task, which decodes the video
//! off the runtime threads and hands the result to the [`Recipient`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::sync::mpsc;

use crate::identity::Identity;
use crate::tasks::TaskId;

pub const NO_VIDEO: &str = "no video in response";

/// A finished task as reported by the worker. The video stays base64 until
/// the consumer decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Video {
        task_id: TaskId,
        video_base64: String,
    },
    Failed {
        task_id: TaskId,
        detail: String,
    },
}

impl Completion {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Completion::Video { task_id, .. } | Completion::Failed { task_id, .. } => task_id,
        }
    }

    /// Decode the video. Empty or invalid base64 becomes a failure notice.
    pub fn into_delivery(self) -> Delivery {
        let (task_id, video_base64) = match self {
            Completion::Failed { task_id, detail } => return Delivery::Failed { task_id, detail },
            Completion::Video {
                task_id,
                video_base64,
            } => (task_id, video_base64),
        };

        match STANDARD.decode(video_base64.trim()) {
            Ok(bytes) if !bytes.is_empty() => Delivery::Video {
                task_id,
                bytes,
                filename: video_filename(),
            },
            Ok(_) => Delivery::Failed {
                task_id,
                detail: NO_VIDEO.to_string(),
            },
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "callback video is not valid base64");
                Delivery::Failed {
                    task_id,
                    detail: NO_VIDEO.to_string(),
                }
            }
        }
    }
}

/// What a user receives when their task completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The generated video.
    Video {
        task_id: TaskId,
        bytes: Vec<u8>,
        filename: String,
    },
    /// The task failed; `detail` is shown to the user.
    Failed { task_id: TaskId, detail: String },
}

/// The front-end side of delivery. Implemented by whatever talks to users.
#[async_trait]
pub trait Recipient: Send + Sync {
    async fn deliver(&self, identity: Identity, delivery: Delivery) -> Result<()>;
}

pub type DeliveryReceiver = mpsc::UnboundedReceiver<(Identity, Completion)>;

/// Sending half of the hand-off channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<(Identity, Completion)>,
}

impl DeliveryQueue {
    pub fn channel() -> (Self, DeliveryReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a delivery. Never blocks. Returns false if the consumer is gone.
    pub fn send(&self, identity: Identity, completion: Completion) -> bool {
        let task_id = completion.task_id().clone();
        match self.tx.send((identity, completion)) {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(%identity, %task_id, "delivery consumer stopped, dropping result");
                false
            }
        }
    }
}

/// Drain the channel until every sender is dropped.
pub async fn run_deliveries(mut rx: DeliveryReceiver, recipient: Arc<dyn Recipient>) {
    while let Some((identity, completion)) = rx.recv().await {
        let recipient = Arc::clone(&recipient);
        tokio::spawn(async move {
            let task_id = completion.task_id().clone();
            let delivery =
                match tokio::task::spawn_blocking(move || completion.into_delivery()).await {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        tracing::error!(%identity, %task_id, error = %e, "video decode aborted");
                        return;
                    }
                };
            match recipient.deliver(identity, delivery).await {
                Ok(()) => tracing::info!(%identity, %task_id, "delivered"),
                Err(e) => tracing::warn!(%identity, %task_id, error = %e, "delivery failed"),
            }
        });
    }
    tracing::debug!("delivery channel closed");
}

/// Filename for a delivered video, stamped with the current UTC time.
pub fn video_filename() -> String {
    format!("video_{}.mp4", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
}
