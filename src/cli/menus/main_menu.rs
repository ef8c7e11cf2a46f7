// Main menu

use uuid::Uuid;

use super::{agent, agent_ids, module, module_names, words};
use crate::backend::Backend;
use crate::bus::UserMessage;
use crate::cli::commands::{skip_confirmation, CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{MenuContext, Selection};
use crate::config::constants::{BROADCAST_AGENT_ID, VERSION};

const BANNER: &str = r#"
   ___ __ _(_)_ __ _ __
  / __/ _` | | '__| '_ \
 | (_| (_| | | |  | | | |
  \___\__,_|_|_|  |_| |_|
"#;

pub(super) fn register(table: &mut CommandTable) {
    table.insert("agent", agent_command);
    table.insert("banner", banner);
    table.insert("clearqueue", clear_queue);
    table.insert("interact", agent::interact);
    table.insert("listeners", listeners);
    table.insert("listqueue", list_queue);
    table.insert("queue", queue);
    table.insert("remove", remove);
    table.insert("sessions", agent::sessions);
    table.insert("set", set_flag);
    table.insert("use", use_command);
    table.insert("version", version);
}

pub(super) fn completion(backend: &Backend) -> Vec<Node> {
    vec![
        Node::branch(
            "agent",
            vec![
                Node::word("list"),
                Node::branch("interact", vec![agent_ids(backend)]),
                Node::branch("remove", vec![agent_ids(backend)]),
            ],
        ),
        Node::word("banner"),
        Node::word("clearqueue"),
        Node::word("help"),
        Node::branch("interact", vec![agent_ids(backend)]),
        Node::word("listeners"),
        Node::word("listqueue"),
        Node::word("main"),
        Node::branch("queue", vec![Node::word("all"), agent_ids(backend)]),
        Node::word("quit"),
        Node::branch("remove", vec![agent_ids(backend)]),
        Node::word("sessions"),
        Node::branch(
            "set",
            vec![
                Node::branch("debug", words(&["true", "false"])),
                Node::branch("verbose", words(&["true", "false"])),
            ],
        ),
        Node::branch("use", vec![Node::branch("module", vec![module_names(backend)])]),
        Node::word("version"),
    ]
}

/// `agent list|interact <id>|remove <id>`
fn agent_command(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    match args.get(1).map(|s| s.to_lowercase()).as_deref() {
        Some("list") => agent::sessions(ctx, args),
        Some("interact") => agent::interact(ctx, &args[1..]),
        Some("remove") => remove(ctx, &args[1..]),
        _ => {
            ctx.publish(UserMessage::warn("Invalid syntax. Use: agent list|interact|remove"));
            Outcome::Stay
        }
    }
}

fn banner(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    ctx.publish(UserMessage::plain(format!(
        "{}\n\t\t   Version: {}",
        BANNER, VERSION
    )));
    Outcome::Stay
}

fn clear_queue(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if skip_confirmation(args)
        || ctx.confirm("Are you sure you want to clear all unassigned jobs?")
    {
        ctx.backend.jobs.clear_unassigned();
        ctx.publish(UserMessage::plain("Unassigned jobs removed"));
    }
    Outcome::Stay
}

fn listeners(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::ListenersMain, Selection::None)
}

fn list_queue(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let jobs = ctx.backend.jobs.list_unassigned();
    ctx.publish(UserMessage::plain(format!("Unassigned jobs: \n{}", jobs)));
    Outcome::Stay
}

/// `queue <id|all> <command...>`: run an agent-menu command for any agent id.
fn queue(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if args.len() < 3 {
        ctx.publish(UserMessage::warn("Invalid syntax."));
        return Outcome::Stay;
    }

    let target = if args[1].eq_ignore_ascii_case("all") {
        BROADCAST_AGENT_ID.to_string()
    } else {
        args[1].clone()
    };
    let Ok(id) = Uuid::parse_str(&target) else {
        ctx.publish(UserMessage::warn(format!("Invalid uuid: {}", args[1])));
        return Outcome::Stay;
    };

    let command = &args[2..];
    let Some(handler) = ctx.dispatcher.handler(MenuContext::Agent, &command[0]) else {
        ctx.publish(UserMessage::info(format!("Unknown command: {}", command[0])));
        return Outcome::Stay;
    };

    tracing::debug!(agent = %id, command = %command[0], "Queueing command");
    let previous = ctx.target.replace(id);
    let outcome = handler(ctx, command);
    ctx.target = previous;
    outcome
}

/// `remove <id>`
fn remove(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    match args.get(1) {
        Some(token) => agent::remove_agent(ctx, token),
        None => ctx.publish(UserMessage::warn("Invalid syntax. Use: remove <agent_id>")),
    }
    Outcome::Stay
}

/// `set verbose|debug true|false`
fn set_flag(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if args.len() < 3 {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: set verbose|debug true|false"));
        return Outcome::Stay;
    }

    let enabled = match args[2].to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => {
            ctx.publish(UserMessage::warn(format!("Invalid value: {}", other)));
            return Outcome::Stay;
        }
    };
    let state = if enabled { "enabled" } else { "disabled" };

    match args[1].to_lowercase().as_str() {
        "verbose" => {
            ctx.flags.set_verbose(enabled);
            ctx.publish(UserMessage::success(format!("Verbose output {}", state)));
        }
        "debug" => {
            ctx.flags.set_debug(enabled);
            ctx.publish(UserMessage::success(format!("Debug output {}", state)));
        }
        other => ctx.publish(UserMessage::warn(format!("Invalid setting: {}", other))),
    }
    Outcome::Stay
}

/// `use module <name>`
fn use_command(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    match args.get(1).map(|s| s.to_lowercase()).as_deref() {
        Some("module") => match args.get(2) {
            Some(name) => module::load_module(ctx, name),
            None => {
                ctx.publish(UserMessage::warn("Invalid module"));
                Outcome::Stay
            }
        },
        _ => {
            ctx.publish(UserMessage::note("Invalid 'use' command"));
            Outcome::Stay
        }
    }
}

fn version(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    ctx.publish(UserMessage::plain(format!("Cairn version: {}", VERSION)));
    Outcome::Stay
}
