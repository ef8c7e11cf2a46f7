// Listener setup menu: edit a draft, then create and start it

use super::listeners::{listener_ref, options_table};
use super::{listener_options, words};
use crate::backend::Backend;
use crate::bus::UserMessage;
use crate::cli::commands::{CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{MenuContext, Selection};

pub(super) fn register(table: &mut CommandTable) {
    table.insert("back", back);
    table.insert("execute", create);
    table.insert("info", show);
    table.insert("run", create);
    table.insert("set", set);
    table.insert("show", show);
    table.insert("start", create);
    table.insert("stop", stop);
}

pub(super) fn completion(selection: &Selection, backend: &Backend) -> Vec<Node> {
    let protocol = selection.draft().map(|(p, _)| p).unwrap_or_default();
    let mut roots = words(&["back", "execute", "help", "info", "main", "quit", "run"]);
    roots.push(Node::branch("set", vec![listener_options(backend, protocol)]));
    roots.extend(words(&["show", "start", "stop"]));
    roots
}

fn back(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::ListenersMain, Selection::None)
}

fn show(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    if let Some((_, options)) = ctx.session.selection().draft() {
        let table = options_table(options, &[]);
        ctx.publish(UserMessage::plain(table));
    }
    Outcome::Stay
}

/// `set <option> <value...>`
fn set(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(requested) = args.get(1) else {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: set <option> <value>"));
        return Outcome::Stay;
    };
    let Some(options) = ctx.session.selection_mut().draft_mut() else {
        return Outcome::Stay;
    };

    let key = options
        .keys()
        .find(|key| key.eq_ignore_ascii_case(requested))
        .cloned();
    let msg = match key {
        Some(key) => {
            let value = args[2..].join(" ");
            options.insert(key.clone(), value.clone());
            UserMessage::success(format!("set {} to: {}", key, value))
        }
        None => UserMessage::failure(format!("invalid listener option: {}", requested)),
    };
    ctx.publish(msg);
    Outcome::Stay
}

/// `start` / `run` / `execute`: create the listener, start it, and
/// switch to its menu.
fn create(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some((_, options)) = ctx.session.selection().draft() else {
        return Outcome::Stay;
    };
    let options = options.clone();

    let id = match ctx.backend.listeners.create(&options) {
        Ok((id, msg)) => {
            ctx.publish(msg);
            id
        }
        Err(msg) => {
            ctx.publish(msg);
            return Outcome::Stay;
        }
    };
    if id.is_nil() {
        ctx.publish(UserMessage::failure("a nil Listener UUID was returned"));
        return Outcome::Stay;
    }

    let name = options.get("Name").cloned().unwrap_or_default();
    let started = ctx.backend.listeners.start(&name);
    ctx.publish(started);

    match ctx.backend.listeners.configured_options(id) {
        Ok(configured) => {
            let name = configured.get("Name").cloned().unwrap_or(name);
            let listener = listener_ref(ctx, id, name);
            Outcome::Enter(MenuContext::Listener, Selection::Listener(listener))
        }
        Err(msg) => {
            ctx.publish(msg);
            Outcome::Stay
        }
    }
}

fn stop(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let name = ctx
        .session
        .selection()
        .draft()
        .and_then(|(_, options)| options.get("Name").cloned())
        .unwrap_or_default();
    let msg = ctx.backend.listeners.stop(&name);
    ctx.publish(msg);
    Outcome::Stay
}
