use async_trait::async_trait;

use super::{Command, CommandResult, Session};

/// Global view of the queue. Admin only.
pub struct StatsCommand;

#[async_trait]
impl Command for StatsCommand {
    fn name(&self) -> &str {
        "/stats"
    }

    fn description(&self) -> &str {
        "list every in-flight task (admin)"
    }

    async fn execute(&self, _args: &str, session: &Session) -> CommandResult {
        match render(session) {
            Some(text) => println!("{text}"),
            None => println!("  not authorized"),
        }
        CommandResult::Handled
    }
}

fn render(session: &Session) -> Option<String> {
    if !session.is_admin {
        return None;
    }
    let core = session.submitter.core();
    let tasks = core.admission.in_flight();
    let mut out = format!(
        "  in flight {}/{} ({} registered)",
        tasks.len(),
        core.admission.max_global(),
        core.registry.len()
    );
    for (task_id, identity) in &tasks {
        let kind = core
            .registry
            .get(task_id)
            .map(|t| t.kind.label())
            .unwrap_or("?");
        out.push_str(&format!("\n  {task_id}  user {identity}  {kind}"));
    }
    Some(out)
}
