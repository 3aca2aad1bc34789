//! Line-based front-end: reads commands from stdin, prints results, and
//! saves delivered videos to disk.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{CommandRegistry, CommandResult, Session};
use crate::delivery::{Delivery, Recipient};
use crate::identity::Identity;

/// Writes finished videos under `output_dir` and prints notices.
pub struct ConsoleRecipient {
    output_dir: PathBuf,
}

impl ConsoleRecipient {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl Recipient for ConsoleRecipient {
    async fn deliver(&self, identity: Identity, delivery: Delivery) -> Result<()> {
        match delivery {
            Delivery::Video {
                task_id,
                bytes,
                filename,
            } => {
                tokio::fs::create_dir_all(&self.output_dir)
                    .await
                    .with_context(|| format!("cannot create {}", self.output_dir.display()))?;
                let path = self.output_dir.join(format!("{task_id}_{filename}"));
                tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("cannot write {}", path.display()))?;
                println!(
                    "\n  ✓ video for user {identity} saved to {} ({} bytes)",
                    path.display(),
                    bytes.len()
                );
            }
            Delivery::Failed { task_id, detail } => {
                println!("\n  ✗ task {task_id} for user {identity} failed: {detail}");
            }
        }
        Ok(())
    }
}

/// Run the REPL until `/quit`, EOF, or Ctrl+C.
pub async fn run_repl(registry: &CommandRegistry, session: &Session) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\ngenrelay> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match registry.dispatch(input, session).await {
            CommandResult::Quit => break,
            CommandResult::Handled => {}
            CommandResult::NotACommand => {
                println!("  start a job with /t2v <prompt>, or type /help");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskId;

    #[tokio::test]
    async fn video_is_written_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("videos");
        let recipient = ConsoleRecipient::new(out.clone());

        recipient
            .deliver(
                Identity(1),
                Delivery::Video {
                    task_id: TaskId::from("abc"),
                    bytes: b"mp4".to_vec(),
                    filename: "video_20250101_000000.mp4".to_string(),
                },
            )
            .await
            .unwrap();

        let written = std::fs::read(out.join("abc_video_20250101_000000.mp4")).unwrap();
        assert_eq!(written, b"mp4");
    }

    #[tokio::test]
    async fn failure_notice_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let recipient = ConsoleRecipient::new(dir.path().to_path_buf());
        recipient
            .deliver(
                Identity(1),
                Delivery::Failed {
                    task_id: TaskId::from("abc"),
                    detail: "oom".to_string(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unwritable_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // a regular file where the directory should be
        let recipient = ConsoleRecipient::new(blocker.join("videos"));
        let result = recipient
            .deliver(
                Identity(1),
                Delivery::Video {
                    task_id: TaskId::from("abc"),
                    bytes: b"mp4".to_vec(),
                    filename: "v.mp4".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
    }
}
