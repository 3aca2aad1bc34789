use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::Path;

use super::{Command, CommandResult, Session};
use crate::job::{CameraMotion, JobKind, JobSpec};

/// Builds a job of one kind from command arguments and submits it.
pub struct GenerateCommand {
    kind: JobKind,
}

impl GenerateCommand {
    pub fn new(kind: JobKind) -> Self {
        Self { kind }
    }

    /// Parse arguments and load any media files.
    pub async fn build(&self, args: &str) -> Result<JobSpec> {
        match self.kind {
            JobKind::TextToVideo => JobSpec::text_to_video(args),
            JobKind::ImageToVideo => {
                let (image, prompt) = split_arg(args, "image")?;
                JobSpec::image_to_video(&read_media(image).await?, prompt)
            }
            JobKind::Animate => {
                let (reference, rest) = split_arg(args, "reference image")?;
                let (video, prompt) = split_arg(rest, "video")?;
                JobSpec::animate(
                    &read_media(reference).await?,
                    &read_media(video).await?,
                    prompt,
                )
            }
            JobKind::CameraMotion => {
                let (motion, rest) = split_arg(args, "camera motion")?;
                let motion: CameraMotion = motion.parse()?;
                let (image, prompt) = split_arg(rest, "image")?;
                JobSpec::camera_motion(motion, &read_media(image).await?, prompt)
            }
        }
    }
}

#[async_trait]
impl Command for GenerateCommand {
    fn name(&self) -> &str {
        match self.kind {
            JobKind::TextToVideo => "/t2v",
            JobKind::ImageToVideo => "/i2v",
            JobKind::Animate => "/animate",
            JobKind::CameraMotion => "/camera",
        }
    }

    fn usage(&self) -> &str {
        match self.kind {
            JobKind::TextToVideo => "<prompt>",
            JobKind::ImageToVideo => "<image> <prompt>",
            JobKind::Animate => "<image> <video> <prompt>",
            JobKind::CameraMotion => "<motion> <image> <prompt>",
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            JobKind::TextToVideo => "generate a video from text",
            JobKind::ImageToVideo => "animate an image",
            JobKind::Animate => "transfer motion from a video to a character",
            JobKind::CameraMotion => "apply a camera motion to an image",
        }
    }

    async fn execute(&self, args: &str, session: &Session) -> CommandResult {
        let spec = match self.build(args).await {
            Ok(spec) => spec,
            Err(e) => {
                println!("  {e:#}");
                println!("  usage: {} {}", self.name(), self.usage());
                return CommandResult::Handled;
            }
        };
        let spec = match session.take_negative_prompt() {
            Some(negative) => spec.with_negative_prompt(&negative),
            None => spec,
        };

        // Outcome is printed by the spawned task.
        let _ = session.spawn_submit(spec);
        CommandResult::Handled
    }
}

/// Split off the first whitespace-separated argument.
fn split_arg<'a>(args: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    let args = args.trim();
    match args.split_once(char::is_whitespace) {
        Some((first, rest)) => Ok((first, rest.trim())),
        None if args.is_empty() => bail!("missing {what}"),
        None => Ok((args, "")),
    }
}

async fn read_media(path: &str) -> Result<Vec<u8>> {
    tokio::fs::read(Path::new(path))
        .await
        .with_context(|| format!("cannot read {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_session_with;
    use crate::worker::mock::MockWorkerClient;
    use std::sync::Arc;

    #[test]
    fn split_arg_cases() {
        assert_eq!(split_arg("a.png zoom in", "image").unwrap(), ("a.png", "zoom in"));
        assert_eq!(split_arg("a.png", "image").unwrap(), ("a.png", ""));
        assert!(split_arg("   ", "image").is_err());
    }

    #[tokio::test]
    async fn t2v_builds_from_prompt() {
        let spec = GenerateCommand::new(JobKind::TextToVideo)
            .build("A beautiful sunset over the ocean")
            .await
            .unwrap();
        assert_eq!(spec.kind(), JobKind::TextToVideo);
    }

    #[tokio::test]
    async fn i2v_reads_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        let args = format!("{} camera slowly zooming in", image.display());
        let spec = GenerateCommand::new(JobKind::ImageToVideo)
            .build(&args)
            .await
            .unwrap();
        assert_eq!(spec.get("prompt").and_then(|v| v.as_str()), Some("camera slowly zooming in"));
        assert!(spec.get("image_base64").is_some());
    }

    #[tokio::test]
    async fn camera_rejects_unknown_motion() {
        let err = GenerateCommand::new(JobKind::CameraMotion)
            .build("Spin x.png a landscape")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown camera motion"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = GenerateCommand::new(JobKind::ImageToVideo)
            .build("/definitely/not/here.png a prompt here")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[tokio::test]
    async fn bad_input_submits_nothing() {
        let worker = Arc::new(MockWorkerClient::accepting(1));
        let session = test_session_with(worker.clone(), false);
        let result = GenerateCommand::new(JobKind::TextToVideo)
            .execute("cat", &session)
            .await;
        assert!(matches!(result, CommandResult::Handled));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(worker.requests().is_empty());
    }

    #[tokio::test]
    async fn negative_prompt_is_applied_and_cleared() {
        let worker = Arc::new(MockWorkerClient::accepting(1));
        let session = test_session_with(worker.clone(), false);
        session.set_negative_prompt(Some("blurry, low quality".to_string()));

        let result = GenerateCommand::new(JobKind::TextToVideo)
            .execute("A beautiful sunset over the ocean", &session)
            .await;
        assert!(matches!(result, CommandResult::Handled));
        // submission runs on a spawned task
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let requests = worker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "http://worker.test/api/generate/t2v");
        assert_eq!(requests[0].1["negative_prompt"], "blurry, low quality");
        assert!(session.take_negative_prompt().is_none());
    }

    #[test]
    fn names_per_kind() {
        assert_eq!(GenerateCommand::new(JobKind::Animate).name(), "/animate");
        assert_eq!(GenerateCommand::new(JobKind::CameraMotion).usage(), "<motion> <image> <prompt>");
    }
}
