// Listener menu: one created listener

use super::listeners::{listener_ref, options_table};
use super::{listener_options, words};
use crate::backend::Backend;
use crate::bus::UserMessage;
use crate::cli::commands::{skip_confirmation, CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{ListenerRef, MenuContext, Selection};

pub(super) fn register(table: &mut CommandTable) {
    table.insert("back", back);
    table.insert("delete", delete);
    table.insert("info", info);
    table.insert("remove", delete);
    table.insert("restart", restart);
    table.insert("set", set);
    table.insert("show", info);
    table.insert("start", start);
    table.insert("status", status);
    table.insert("stop", stop);
}

pub(super) fn completion(selection: &Selection, backend: &Backend) -> Vec<Node> {
    let protocol = selection
        .listener()
        .map(|l| l.protocol.as_str())
        .unwrap_or_default();
    let mut roots = words(&["back", "delete", "help", "info", "main", "quit", "remove", "restart"]);
    roots.push(Node::branch("set", vec![listener_options(backend, protocol)]));
    roots.extend(words(&["show", "start", "status", "stop"]));
    roots
}

fn selected(ctx: &CommandContext<'_>) -> Option<ListenerRef> {
    ctx.session.selection().listener().cloned()
}

fn back(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::ListenersMain, Selection::None)
}

/// `delete [-y]` / `remove [-y]`
fn delete(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(listener) = selected(ctx) else {
        return Outcome::Stay;
    };
    let question = format!("Are you sure you want to delete the {} listener?", listener.name);
    if !skip_confirmation(args) && !ctx.confirm(&question) {
        return Outcome::Stay;
    }

    let removed = ctx.backend.listeners.remove(&listener.name);
    let failed = removed.is_error();
    ctx.publish(removed);
    if failed {
        Outcome::Stay
    } else {
        Outcome::Enter(MenuContext::ListenersMain, Selection::None)
    }
}

/// Configured options plus the current status
fn info(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(listener) = selected(ctx) else {
        return Outcome::Stay;
    };
    let options = match ctx.backend.listeners.configured_options(listener.id) {
        Ok(options) => options,
        Err(msg) => {
            ctx.publish(msg);
            return Outcome::Stay;
        }
    };
    let status = ctx.backend.listeners.status(listener.id);
    if status.is_error() {
        ctx.publish(status);
        return Outcome::Stay;
    }

    let table = options_table(&options, &[("Status", status.text())]);
    ctx.publish(UserMessage::plain(table));
    Outcome::Stay
}

/// Restart, then refresh the cached snapshot and prompt from the new options.
fn restart(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(listener) = selected(ctx) else {
        return Outcome::Stay;
    };
    let msg = ctx.backend.listeners.restart(listener.id);
    ctx.publish(msg);

    match ctx.backend.listeners.configured_options(listener.id) {
        Ok(options) => {
            let name = options.get("Name").cloned().unwrap_or(listener.name);
            let refreshed = listener_ref(ctx, listener.id, name);
            Outcome::Enter(MenuContext::Listener, Selection::Listener(refreshed))
        }
        Err(msg) => {
            ctx.publish(msg);
            Outcome::Stay
        }
    }
}

fn set(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if let Some(listener) = selected(ctx) {
        let msg = ctx.backend.listeners.set_option(listener.id, args);
        ctx.publish(msg);
    }
    Outcome::Stay
}

fn start(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    if let Some(listener) = selected(ctx) {
        let msg = ctx.backend.listeners.start(&listener.name);
        ctx.publish(msg);
    }
    Outcome::Stay
}

fn status(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    if let Some(listener) = selected(ctx) {
        let msg = ctx.backend.listeners.status(listener.id);
        ctx.publish(msg);
    }
    Outcome::Stay
}

fn stop(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    if let Some(listener) = selected(ctx) {
        let msg = ctx.backend.listeners.stop(&listener.name);
        ctx.publish(msg);
    }
    Outcome::Stay
}
