use async_trait::async_trait;

use super::{Command, CommandResult, Session};

/// Placeholder entry so `/help` shows up in the registry; the registry
/// renders the actual help text.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "show available commands"
    }

    async fn execute(&self, _args: &str, _session: &Session) -> CommandResult {
        CommandResult::Handled
    }
}
