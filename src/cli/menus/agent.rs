// Agent menu
//
// Most commands are taskings forwarded verbatim to the agent registry.
// `queue <id> ...` from the main menu reuses this table with an explicit
// target agent.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{agent_ids, words};
use crate::backend::{AgentStatus, Backend};
use crate::bus::UserMessage;
use crate::cli::commands::{joined_args, skip_confirmation, CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{MenuContext, Selection};
use crate::cli::table::Table;

/// Commands forwarded to the registry's tasking contract
const TASKINGS: &[&str] = &[
    "batchcommands",
    "cd",
    "download",
    "exec",
    "ifconfig",
    "inactivemultiplier",
    "inactivethreshold",
    "ipconfig",
    "ja3",
    "kill",
    "killdate",
    "ls",
    "maxretry",
    "padding",
    "ps",
    "pwd",
    "sdelete",
    "shinject",
    "sleep",
    "timestomp",
    "touch",
    "upload",
    "winexec",
];

const LIST_HEADERS: [&str; 9] = [
    "Agent GUID",
    "Note",
    "Platform",
    "Host",
    "Transport",
    "Status",
    "User",
    "Process",
    "Last checkin",
];

pub(super) fn register(table: &mut CommandTable) {
    for &name in TASKINGS {
        table.insert(name, task);
    }
    table.insert("back", back);
    table.insert("c", clear);
    table.insert("clear", clear);
    table.insert("exit", exit);
    table.insert("info", info);
    table.insert("interact", interact);
    table.insert("jobs", jobs);
    table.insert("note", note);
    table.insert("sessions", sessions);
    table.insert("status", status);
}

pub(super) fn completion(backend: &Backend) -> Vec<Node> {
    let mut roots = words(&["back", "clear", "exit", "help", "info"]);
    roots.push(Node::branch("interact", vec![agent_ids(backend)]));
    roots.extend(words(&["jobs", "main", "note", "quit", "sessions", "status"]));
    for name in TASKINGS {
        roots.push(match *name {
            "shinject" => Node::branch(
                "shinject",
                words(&["self", "remote", "RtlCreateUserThread"]),
            ),
            other => Node::word(other),
        });
    }
    roots
}

/// Friendly name for an agent transport code
pub fn transport_name(code: &str) -> String {
    match code {
        "http" => "HTTP/1.1 clear-text".to_string(),
        "https" => "HTTP/1.1 over TLS".to_string(),
        "h2c" => "HTTP/2 clear-text".to_string(),
        "h2" => "HTTP/2 over TLS".to_string(),
        "http3" => "HTTP/3 (HTTP/2 over QUIC)".to_string(),
        other => format!("Unknown: {}", other),
    }
}

/// Time since the last check-in as `H:M:S ago`
pub fn format_checkin_age(last_checkin: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - last_checkin).num_seconds().max(0);
    format!("{}:{}:{} ago", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Base name of a process path, for either path separator
fn process_name(platform: &str, process: &str) -> String {
    let separator = if platform.eq_ignore_ascii_case("windows") {
        '\\'
    } else {
        '/'
    };
    process
        .rsplit(separator)
        .next()
        .unwrap_or(process)
        .to_string()
}

/// `sessions` / `agent list`
pub(super) fn sessions(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let now = Utc::now();
    let mut table = Table::new(LIST_HEADERS);
    for agent in ctx.backend.agents.list() {
        let status = ctx.backend.agents.status(agent.id);
        table.push_row([
            agent.id.to_string(),
            agent.note.clone(),
            format!("{}/{}", agent.platform, agent.architecture),
            agent.hostname.clone(),
            transport_name(&agent.transport),
            status.to_string(),
            agent.username.clone(),
            format!("{}({})", process_name(&agent.platform, &agent.process), agent.pid),
            format_checkin_age(agent.last_checkin, now),
        ]);
    }
    ctx.publish(UserMessage::plain(table.render()));
    Outcome::Stay
}

/// `interact <id>`: enter the agent menu for a known agent.
pub(super) fn interact(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(token) = args.get(1) else {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: interact <agent_id>"));
        return Outcome::Stay;
    };

    let Ok(id) = Uuid::parse_str(token) else {
        ctx.publish(UserMessage::failure(format!(
            "There was an error interacting with agent {}",
            token
        )));
        return Outcome::Stay;
    };

    if ctx.backend.agents.get(id).is_none() {
        ctx.publish(UserMessage::failure(format!("{} is not a known agent", id)));
        return Outcome::Stay;
    }

    Outcome::Enter(MenuContext::Agent, Selection::Agent(id))
}

/// Remove an agent from the registry by its id text.
pub(super) fn remove_agent(ctx: &mut CommandContext<'_>, token: &str) {
    let Ok(id) = Uuid::parse_str(token) else {
        ctx.publish(UserMessage::failure(format!(
            "There was an error interacting with agent {}",
            token
        )));
        return;
    };

    match ctx.backend.agents.remove(id) {
        Ok(()) => ctx.publish(UserMessage::info(format!(
            "Agent {} was removed from the server at {}",
            token,
            Utc::now().to_rfc3339()
        ))),
        Err(msg) => ctx.publish(msg),
    }
}

/// Resolve the target agent or report that none is selected.
fn target(ctx: &CommandContext<'_>) -> Option<Uuid> {
    let target = ctx.agent_target();
    if target.is_none() {
        ctx.publish(UserMessage::warn("No agent selected"));
    }
    target
}

fn task(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if let Some(id) = target(ctx) {
        let msg = ctx.backend.agents.task(id, args);
        ctx.publish(msg);
    }
    Outcome::Stay
}

fn back(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::Main, Selection::None)
}

/// `clear [-y]`: drop every job queued for the agent.
fn clear(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    let question = format!("Are you sure you want to clear all queued commands for agent {}?", id);
    if !skip_confirmation(args) && !ctx.confirm(&question) {
        return Outcome::Stay;
    }

    match ctx.backend.jobs.clear_jobs(id) {
        Ok(()) => ctx.publish(UserMessage::success("Cleared all queued commands")),
        Err(msg) => ctx.publish(UserMessage::failure(format!(
            "Error clearing queued commands: {}",
            msg.text()
        ))),
    }
    Outcome::Stay
}

/// `exit [-y]`: task the agent to quit and leave its menu.
fn exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    if !skip_confirmation(args) && !ctx.confirm("Are you sure you want to exit the agent?") {
        return Outcome::Stay;
    }

    let command: Vec<String> = vec!["exit".to_string()];
    let msg = ctx.backend.agents.task(id, &command);
    ctx.publish(msg);
    Outcome::Enter(MenuContext::Main, Selection::None)
}

fn info(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    match ctx.backend.agents.info(id) {
        Ok(rows) => {
            let mut table = Table::new(["Name", "Value"]);
            for (name, value) in rows {
                table.push_row([name, value]);
            }
            ctx.publish(UserMessage::plain(table.render()));
        }
        Err(msg) => ctx.publish(msg),
    }
    Outcome::Stay
}

fn jobs(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    match ctx.backend.jobs.list_jobs(id) {
        Ok(jobs) => ctx.publish(UserMessage::success(format!(
            "Queued commands:\n{}",
            jobs.join("\n")
        ))),
        Err(msg) => ctx.publish(UserMessage::failure(format!(
            "Error retrieving queued commands: {}",
            msg.text()
        ))),
    }
    Outcome::Stay
}

/// `note <text...>`
fn note(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    let text = joined_args(args);
    match ctx.backend.agents.set_note(id, &text) {
        Ok(()) => ctx.publish(UserMessage::success(format!("Note set to: {}", text))),
        Err(msg) => ctx.publish(UserMessage::failure(format!(
            "Error setting note: {}",
            msg.text()
        ))),
    }
    Outcome::Stay
}

fn status(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(id) = target(ctx) else {
        return Outcome::Stay;
    };
    let msg = match ctx.backend.agents.status(id) {
        AgentStatus::Active => UserMessage::success(format!("{} agent is active", id)),
        AgentStatus::Delayed => UserMessage::note(format!("{} agent is delayed", id)),
        AgentStatus::Dead => UserMessage::warn(format!("{} agent is dead", id)),
        AgentStatus::Other(other) => UserMessage::info(format!("{} agent is {}", id, other)),
    };
    ctx.publish(msg);
    Outcome::Stay
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transport_names() {
        assert_eq!(transport_name("h2"), "HTTP/2 over TLS");
        assert_eq!(transport_name("http3"), "HTTP/3 (HTTP/2 over QUIC)");
        assert_eq!(transport_name("smb"), "Unknown: smb");
    }

    #[test]
    fn test_checkin_age() {
        let now = Utc::now();
        let then = now - Duration::seconds(3600 + 2 * 60 + 5);
        assert_eq!(format_checkin_age(then, now), "1:2:5 ago");
        assert_eq!(format_checkin_age(now, now), "0:0:0 ago");
    }

    #[test]
    fn test_process_name() {
        assert_eq!(process_name("linux", "/usr/bin/agent"), "agent");
        assert_eq!(process_name("windows", "C:\\Temp\\agent.exe"), "agent.exe");
        assert_eq!(process_name("darwin", "agent"), "agent");
    }

    #[test]
    fn test_every_tasking_completes() {
        let backend = Backend::in_memory(std::env::temp_dir());
        let names: Vec<String> = completion(&backend)
            .into_iter()
            .filter_map(|node| match node {
                Node::Literal { name, .. } => Some(name),
                Node::Dynamic(_) => None,
            })
            .collect();
        for tasking in TASKINGS {
            assert!(names.iter().any(|n| n == tasking), "{}", tasking);
        }
    }
}
