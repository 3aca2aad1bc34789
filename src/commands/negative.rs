use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct NegativeCommand;

#[async_trait]
impl Command for NegativeCommand {
    fn name(&self) -> &str {
        "/negative"
    }

    fn usage(&self) -> &str {
        "[text]"
    }

    fn description(&self) -> &str {
        "set what the next video should avoid (empty clears)"
    }

    async fn execute(&self, args: &str, session: &Session) -> CommandResult {
        let args = args.trim();
        if args.is_empty() {
            session.set_negative_prompt(None);
            println!("  negative prompt cleared");
        } else {
            session.set_negative_prompt(Some(args.to_string()));
            println!("  negative prompt set for the next job");
        }
        CommandResult::Handled
    }
}
