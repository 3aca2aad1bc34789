use std::sync::Arc;
use std::time::Duration;

use genrelay::identity::Identity;
use genrelay::job::{CameraMotion, JobSpec};
use genrelay::limits::QueueFull;
use genrelay::state::{CoreState, Limits};
use genrelay::submit::{JobSubmitter, SubmissionOutcome, SubmitterConfig};
use genrelay::tasks::TaskId;
use genrelay::worker::{WorkerResponse, WorkerTimeout};
use genrelay::worker::mock::MockWorkerClient;

const U: Identity = Identity(1001);

fn limits(max_requests: usize, max_global: usize, max_per_identity: usize) -> Limits {
    Limits {
        max_requests,
        rate_window: Duration::from_secs(3600),
        max_global,
        max_per_identity,
    }
}

fn build(limits: Limits, worker: Arc<MockWorkerClient>) -> JobSubmitter {
    JobSubmitter::new(
        CoreState::new(limits),
        worker,
        SubmitterConfig {
            worker_url: "https://worker.test/".to_string(),
            callback_url: "https://bot.test/webhook/result".to_string(),
        },
    )
}

fn t2v() -> JobSpec {
    JobSpec::text_to_video("A beautiful sunset over the ocean").unwrap()
}

fn reply(status: u16, body: &str) -> anyhow::Result<WorkerResponse> {
    Ok(WorkerResponse {
        status,
        body: body.to_string(),
    })
}

#[tokio::test]
async fn accepted_task_stays_pending() {
    let worker = Arc::new(MockWorkerClient::accepting(1));
    let submitter = build(limits(5, 10, 1), worker.clone());

    let outcome = submitter.submit(U, t2v()).await;
    let SubmissionOutcome::Accepted(task_id) = outcome else {
        panic!("expected Accepted, got {outcome:?}");
    };

    let core = submitter.core();
    assert_eq!(core.registry.resolve(&task_id), Some(U));
    assert_eq!(core.snapshot(U).identity_count, 1);
    assert_eq!(core.rate.remaining(U), 4);
}

#[tokio::test]
async fn payload_and_endpoint() {
    let worker = Arc::new(MockWorkerClient::accepting(1));
    let submitter = build(limits(5, 10, 1), worker.clone());

    let spec = JobSpec::camera_motion(CameraMotion::TiltUp, b"img", "a mountain lake").unwrap();
    let outcome = submitter.submit(U, spec).await;
    let SubmissionOutcome::Accepted(task_id) = outcome else {
        panic!("expected Accepted");
    };

    let requests = worker.requests();
    assert_eq!(requests.len(), 1);
    let (url, body) = &requests[0];
    assert_eq!(url, "https://worker.test/api/generate/camera-lora");
    assert_eq!(body["task_id"], task_id.as_str());
    assert_eq!(body["callback_url"], "https://bot.test/webhook/result");
    assert_eq!(body["camera_motion"], "TiltUp");
    assert_eq!(body["prompt"], "a mountain lake");
}

#[tokio::test]
async fn remote_rejection_rolls_back_but_keeps_rate_slot() {
    let long_body = "e".repeat(2000);
    let worker = Arc::new(MockWorkerClient::new(vec![reply(500, &long_body)]));
    let submitter = build(limits(5, 10, 1), worker);
    let core = submitter.core().clone();
    let before = core.snapshot(U);

    let outcome = submitter.submit(U, t2v()).await;
    match outcome {
        SubmissionOutcome::RemoteRejected { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body.len(), 500);
        }
        other => panic!("expected RemoteRejected, got {other:?}"),
    }

    assert_eq!(core.snapshot(U), before);
    assert!(core.registry.is_empty());
    assert_eq!(core.rate.remaining(U), 4);
}

#[tokio::test]
async fn non_200_success_codes_are_rejections() {
    let worker = Arc::new(MockWorkerClient::new(vec![reply(202, "queued")]));
    let submitter = build(limits(5, 10, 1), worker);
    let outcome = submitter.submit(U, t2v()).await;
    assert!(matches!(outcome, SubmissionOutcome::RemoteRejected { status: 202, .. }));
    assert_eq!(submitter.core().snapshot(U).global_count, 0);
}

#[tokio::test]
async fn timeout_rolls_back() {
    let worker = Arc::new(MockWorkerClient::new(vec![Err(
        WorkerTimeout(Duration::from_secs(30)).into(),
    )]));
    let submitter = build(limits(5, 10, 1), worker);

    let outcome = submitter.submit(U, t2v()).await;
    match &outcome {
        SubmissionOutcome::NetworkError { timeout, detail } => {
            assert!(*timeout);
            assert!(detail.contains("30s"));
        }
        other => panic!("expected NetworkError, got {other:?}"),
    }
    assert!(outcome.user_message().contains("timeout"));

    let core = submitter.core();
    assert_eq!(core.snapshot(U).identity_count, 0);
    assert!(core.registry.is_empty());
    assert_eq!(core.rate.remaining(U), 4);
}

#[tokio::test]
async fn connect_failure_is_not_a_timeout() {
    let worker = Arc::new(MockWorkerClient::new(vec![Err(anyhow::anyhow!(
        "could not connect to worker: connection refused"
    ))]));
    let submitter = build(limits(5, 10, 1), worker);

    let outcome = submitter.submit(U, t2v()).await;
    assert!(matches!(
        outcome,
        SubmissionOutcome::NetworkError { timeout: false, .. }
    ));
    assert!(!outcome.user_message().contains("timeout"));
    assert_eq!(submitter.core().admission.global_count(), 0);
}

#[tokio::test]
async fn rate_limit_blocks_before_worker_call() {
    let worker = Arc::new(MockWorkerClient::new(vec![
        reply(500, "a"),
        reply(500, "b"),
    ]));
    let submitter = build(limits(2, 10, 1), worker.clone());

    submitter.submit(U, t2v()).await;
    submitter.submit(U, t2v()).await;

    match submitter.submit(U, t2v()).await {
        SubmissionOutcome::RateLimited(wait) => {
            assert!(wait <= Duration::from_secs(3600));
            assert!(wait > Duration::from_secs(3590));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    // third attempt never reached the worker
    assert_eq!(worker.requests().len(), 2);
}

#[tokio::test]
async fn per_user_queue_full() {
    let worker = Arc::new(MockWorkerClient::accepting(2));
    let submitter = build(limits(5, 10, 1), worker.clone());

    assert!(submitter.submit(U, t2v()).await.is_accepted());
    let outcome = submitter.submit(U, t2v()).await;
    assert_eq!(outcome, SubmissionOutcome::QueueFull(QueueFull::PerIdentity));
    assert_eq!(worker.requests().len(), 1);
    // a refused submission does not consume a rate slot
    assert_eq!(submitter.core().rate.remaining(U), 4);

    assert!(submitter.submit(Identity(2002), t2v()).await.is_accepted());
}

#[tokio::test]
async fn global_queue_full() {
    let worker = Arc::new(MockWorkerClient::accepting(3));
    let submitter = build(limits(5, 2, 1), worker);

    assert!(submitter.submit(Identity(1), t2v()).await.is_accepted());
    assert!(submitter.submit(Identity(2), t2v()).await.is_accepted());
    let outcome = submitter.submit(Identity(3), t2v()).await;
    assert_eq!(outcome, SubmissionOutcome::QueueFull(QueueFull::Global));
    assert!(outcome.user_message().contains("server queue full"));
}

#[tokio::test]
async fn release_after_failure_is_idempotent_with_late_callback() {
    let worker = Arc::new(MockWorkerClient::new(vec![reply(503, "busy")]));
    let submitter = build(limits(5, 10, 1), worker);
    submitter.submit(U, t2v()).await;

    // A stray release for an id that was rolled back changes nothing.
    let core = submitter.core();
    assert!(!core.admission.release(&TaskId::from("whatever"), U));
    assert_eq!(core.snapshot(U).global_count, 0);
}
