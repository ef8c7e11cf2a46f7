// Listeners menu: manage listeners by name

use uuid::Uuid;

use super::{listener_names, listener_types};
use crate::backend::{Backend, OptionMap};
use crate::bus::UserMessage;
use crate::cli::commands::{joined_args, CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{ListenerRef, MenuContext, Selection};
use crate::cli::table::Table;

const LIST_HEADERS: [&str; 6] = ["Name", "Interface", "Port", "Protocol", "Status", "Description"];

pub(super) fn register(table: &mut CommandTable) {
    table.insert("back", back);
    table.insert("delete", delete);
    table.insert("info", info);
    table.insert("interact", interact);
    table.insert("list", list);
    table.insert("start", start);
    table.insert("stop", stop);
    table.insert("use", use_protocol);
}

pub(super) fn completion(backend: &Backend) -> Vec<Node> {
    vec![
        Node::word("back"),
        Node::branch("delete", vec![listener_names(backend)]),
        Node::word("help"),
        Node::branch("info", vec![listener_names(backend)]),
        Node::branch("interact", vec![listener_names(backend)]),
        Node::word("list"),
        Node::word("main"),
        Node::word("quit"),
        Node::branch("start", vec![listener_names(backend)]),
        Node::branch("stop", vec![listener_names(backend)]),
        Node::branch("use", vec![listener_types(backend)]),
    ]
}

/// Two-column option table, optionally with trailing extra rows
pub(super) fn options_table(options: &OptionMap, extra: &[(&str, &str)]) -> String {
    let mut table = Table::new(["Name", "Value"]);
    for (name, value) in options {
        table.push_row([name.as_str(), value.as_str()]);
    }
    for (name, value) in extra {
        table.push_row([*name, *value]);
    }
    table.render()
}

/// Listener name from the remaining words, or a usage warning.
fn name_arg(ctx: &CommandContext<'_>, args: &[String], usage: &str) -> Option<String> {
    let name = joined_args(args);
    if name.is_empty() {
        ctx.publish(UserMessage::warn(format!("Invalid syntax. Use: {}", usage)));
        None
    } else {
        Some(name)
    }
}

fn back(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::Main, Selection::None)
}

/// `delete <name>`: check the listener exists, confirm, then remove it.
fn delete(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(name) = name_arg(ctx, args, "delete <listener_name>") else {
        return Outcome::Stay;
    };

    let exists = ctx.backend.listeners.exists(&name);
    if exists.is_error() {
        ctx.publish(exists);
        return Outcome::Stay;
    }

    let question = format!("Are you sure you want to delete the {} listener?", name);
    if ctx.confirm(&question) {
        let removed = ctx.backend.listeners.remove(&name);
        ctx.publish(removed);
    }
    Outcome::Stay
}

fn info(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(name) = name_arg(ctx, args, "info <listener_name>") else {
        return Outcome::Stay;
    };

    let exists = ctx.backend.listeners.exists(&name);
    if exists.is_error() {
        ctx.publish(exists);
        return Outcome::Stay;
    }

    let id = match ctx.backend.listeners.by_name(&name) {
        Ok(id) if id.is_nil() => {
            ctx.publish(UserMessage::failure("a nil Listener UUID was returned"));
            return Outcome::Stay;
        }
        Ok(id) => id,
        Err(msg) => {
            ctx.publish(msg);
            return Outcome::Stay;
        }
    };

    match ctx.backend.listeners.configured_options(id) {
        Ok(options) => ctx.publish(UserMessage::plain(options_table(&options, &[]))),
        Err(msg) => ctx.publish(msg),
    }
    Outcome::Stay
}

/// Snapshot a created listener for the listener menu.
pub(super) fn listener_ref(ctx: &CommandContext<'_>, id: Uuid, name: String) -> ListenerRef {
    let status = ctx.backend.listeners.status(id).text().to_string();
    let protocol = ctx
        .backend
        .listeners
        .configured_options(id)
        .ok()
        .and_then(|options| options.get("Protocol").cloned())
        .unwrap_or_default();
    ListenerRef {
        id,
        name,
        status,
        protocol,
    }
}

fn interact(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let name = joined_args(args);
    if name.is_empty() {
        ctx.publish(UserMessage::note("you must select a listener to interact with"));
        return Outcome::Stay;
    }

    match ctx.backend.listeners.by_name(&name) {
        Ok(id) if id.is_nil() => Outcome::Stay,
        Ok(id) => {
            let listener = listener_ref(ctx, id, name);
            Outcome::Enter(MenuContext::Listener, Selection::Listener(listener))
        }
        Err(msg) => {
            ctx.publish(msg);
            Outcome::Stay
        }
    }
}

fn list(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let mut table = Table::new(LIST_HEADERS);
    for listener in ctx.backend.listeners.list() {
        table.push_row([
            listener.name,
            listener.interface,
            listener.port.to_string(),
            listener.protocol,
            listener.status,
            listener.description,
        ]);
    }
    ctx.publish(UserMessage::plain(table.render()));
    Outcome::Stay
}

fn start(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if let Some(name) = name_arg(ctx, args, "start <listener_name>") {
        let msg = ctx.backend.listeners.start(&name);
        ctx.publish(msg);
    }
    Outcome::Stay
}

fn stop(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if let Some(name) = name_arg(ctx, args, "stop <listener_name>") {
        let msg = ctx.backend.listeners.stop(&name);
        ctx.publish(msg);
    }
    Outcome::Stay
}

/// `use <protocol>`: start configuring a new listener.
fn use_protocol(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(requested) = args.get(1) else {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: use <protocol>"));
        return Outcome::Stay;
    };

    let protocol = requested.to_lowercase();
    if !ctx.backend.listeners.types().iter().any(|t| *t == protocol) {
        ctx.publish(UserMessage::warn(format!("Invalid listener type: {}", requested)));
        return Outcome::Stay;
    }

    let mut options = ctx.backend.listeners.default_options(&protocol);
    options.insert("Protocol".to_string(), protocol.clone());
    Outcome::Enter(
        MenuContext::ListenerSetup,
        Selection::ListenerDraft { protocol, options },
    )
}
