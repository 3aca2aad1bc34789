use async_trait::async_trait;

use super::{Command, CommandResult, Session};
use crate::consts::format_wait;

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show your active tasks and remaining quota"
    }

    async fn execute(&self, _args: &str, session: &Session) -> CommandResult {
        println!("{}", render(session));
        CommandResult::Handled
    }
}

fn render(session: &Session) -> String {
    let core = session.submitter.core();
    let snap = core.snapshot(session.identity);
    let remaining = core.rate.remaining(session.identity);
    let mut out = format!(
        "  active    {}/{}\n  queue     {}/{}\n  quota     {}/{} per {}",
        snap.identity_count,
        snap.max_per_identity,
        snap.global_count,
        snap.max_global,
        remaining,
        core.rate.max_requests(),
        format_wait(core.rate.window()),
    );
    let decision = core.rate.allowed(session.identity);
    if let Some(wait) = decision.retry_after {
        out.push_str(&format!("\n  next slot in {}", format_wait(wait)));
    }
    out
}
