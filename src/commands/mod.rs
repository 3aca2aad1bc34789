//! Console commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and help generation.

mod generate;
mod help;
mod negative;
mod quit;
mod stats;
mod status;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use crate::identity::Identity;
use crate::job::{JobKind, JobSpec};
use crate::submit::{JobSubmitter, SubmissionOutcome};

pub use generate::GenerateCommand;

/// The local user's session, shared by all commands.
pub struct Session {
    pub identity: Identity,
    pub is_admin: bool,
    pub submitter: Arc<JobSubmitter>,
    /// Applied to the next job, then cleared.
    negative_prompt: Mutex<Option<String>>,
}

impl Session {
    pub fn new(identity: Identity, is_admin: bool, submitter: Arc<JobSubmitter>) -> Self {
        Self {
            identity,
            is_admin,
            submitter,
            negative_prompt: Mutex::new(None),
        }
    }

    pub fn set_negative_prompt(&self, negative: Option<String>) {
        *self
            .negative_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = negative;
    }

    pub fn take_negative_prompt(&self) -> Option<String> {
        self.negative_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Submit in the background so the prompt stays responsive.
    pub fn spawn_submit(&self, spec: JobSpec) -> JoinHandle<SubmissionOutcome> {
        let submitter = Arc::clone(&self.submitter);
        let identity = self.identity;
        let kind = spec.kind();
        tokio::spawn(async move {
            let outcome = submitter.submit(identity, spec).await;
            match &outcome {
                SubmissionOutcome::Accepted(task_id) => {
                    println!("\n  [{kind}] task {task_id}: {}", outcome.user_message());
                }
                _ => println!("\n  [{kind}] {}", outcome.user_message()),
            }
            outcome
        })
    }
}

/// What the REPL should do after a command runs.
pub enum CommandResult {
    /// Not a command.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

/// A console command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/t2v"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis shown in `/help`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command with everything after its name.
    async fn execute(&self, args: &str, session: &Session) -> CommandResult;
}

pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(GenerateCommand::new(JobKind::TextToVideo)),
            Arc::new(GenerateCommand::new(JobKind::ImageToVideo)),
            Arc::new(GenerateCommand::new(JobKind::Animate)),
            Arc::new(GenerateCommand::new(JobKind::CameraMotion)),
            Arc::new(negative::NegativeCommand),
            Arc::new(status::StatusCommand),
            Arc::new(stats::StatsCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, session: &Session) -> CommandResult {
        let input = input.trim();
        let (cmd, args) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry to list all commands
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, session).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}
