// Module menu

use super::{agent_ids, words};
use crate::backend::{Backend, Module};
use crate::bus::UserMessage;
use crate::cli::commands::{CommandContext, CommandTable, Outcome};
use crate::cli::completion::Node;
use crate::cli::context::{MenuContext, Selection};
use crate::cli::table::Table;

pub(super) fn register(table: &mut CommandTable) {
    table.insert("back", back);
    table.insert("info", info);
    table.insert("reload", reload);
    table.insert("run", run);
    table.insert("set", set);
    table.insert("show", show);
    table.insert("unset", unset);
}

/// Option names are fixed for the loaded module, so they are captured here.
pub(super) fn completion(selection: &Selection, backend: &Backend) -> Vec<Node> {
    let options: Vec<String> = selection
        .module()
        .map(Module::option_names)
        .unwrap_or_default();

    let mut set_children = vec![Node::branch(
        "Agent",
        vec![Node::word("all"), agent_ids(backend)],
    )];
    set_children.extend(
        options
            .iter()
            .filter(|name| name.as_str() != "Agent")
            .map(Node::word),
    );

    let mut roots = words(&["back", "help", "info", "main", "quit", "reload", "run"]);
    roots.push(Node::branch("set", set_children));
    roots.push(Node::branch("show", words(&["info", "options"])));
    roots.push(Node::branch(
        "unset",
        options.iter().map(Node::word).collect(),
    ));
    roots
}

/// Load a module by name and enter its menu.
pub(super) fn load_module(ctx: &mut CommandContext<'_>, name: &str) -> Outcome {
    let path = match ctx.backend.modules.path_for(name) {
        Ok(path) => path,
        Err(msg) => {
            ctx.publish(msg);
            return Outcome::Stay;
        }
    };
    match ctx.backend.modules.load(&path) {
        Ok(module) if !module.name.is_empty() => {
            tracing::debug!(module = %module.name, "Module selected");
            Outcome::Enter(MenuContext::Module, Selection::Module(module))
        }
        Ok(_) => {
            ctx.publish(UserMessage::failure(format!("Module {} has no name", name)));
            Outcome::Stay
        }
        Err(msg) => {
            ctx.publish(msg);
            Outcome::Stay
        }
    }
}

fn selected(ctx: &CommandContext<'_>) -> Option<Module> {
    ctx.session.selection().module().cloned()
}

fn back(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::Main, Selection::None)
}

fn show_info(ctx: &CommandContext<'_>, module: &Module) {
    let mut table = Table::new(["Name", "Value"]);
    for (name, value) in module.info_rows() {
        table.push_row([name, value]);
    }
    ctx.publish(UserMessage::plain(table.render()));
}

fn show_options(ctx: &CommandContext<'_>, module: &Module) {
    let mut table = Table::new(["Name", "Value"]);
    for (name, value) in &module.options {
        table.push_row([name.as_str(), value.as_str()]);
    }
    ctx.publish(UserMessage::plain(table.render()));
}

fn info(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    if let Some(module) = selected(ctx) {
        show_info(ctx, &module);
    }
    Outcome::Stay
}

/// `show info|options`
fn show(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(module) = selected(ctx) else {
        return Outcome::Stay;
    };
    match args.get(1).map(|s| s.to_lowercase()).as_deref() {
        Some("info") => show_info(ctx, &module),
        Some("options") => show_options(ctx, &module),
        _ => ctx.publish(UserMessage::warn("Invalid syntax. Use: show info|options")),
    }
    Outcome::Stay
}

/// `set <option> <value...>` or `set Agent <id|all>`
fn set(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if args.len() < 3 {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: set <option> <value>"));
        return Outcome::Stay;
    }
    let Some(module) = ctx.session.selection_mut().module_mut() else {
        return Outcome::Stay;
    };

    let result = if args[1].eq_ignore_ascii_case("agent") {
        module.set_agent(&args[2])
    } else {
        module.set_option(&args[1], &args[2..])
    };

    match result {
        Ok(text) => ctx.publish(UserMessage::success(text)),
        Err(e) => ctx.publish(UserMessage::failure(e.to_string())),
    }
    Outcome::Stay
}

/// `unset <option>`
fn unset(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    let Some(name) = args.get(1) else {
        ctx.publish(UserMessage::warn("Invalid syntax. Use: unset <option>"));
        return Outcome::Stay;
    };
    let Some(module) = ctx.session.selection_mut().module_mut() else {
        return Outcome::Stay;
    };

    match module.unset_option(name) {
        Ok(text) => ctx.publish(UserMessage::success(text)),
        Err(e) => ctx.publish(UserMessage::failure(e.to_string())),
    }
    Outcome::Stay
}

/// Load the module again from its definition, discarding option edits.
fn reload(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(module) = selected(ctx) else {
        return Outcome::Stay;
    };
    match ctx.backend.modules.load(&module.path) {
        Ok(fresh) => {
            ctx.publish(UserMessage::info(format!("Reloaded module {}", fresh.name)));
            Outcome::Enter(MenuContext::Module, Selection::Module(fresh))
        }
        Err(msg) => {
            ctx.publish(msg);
            Outcome::Stay
        }
    }
}

fn run(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let Some(module) = selected(ctx) else {
        return Outcome::Stay;
    };
    for msg in ctx.backend.modules.run(&module) {
        ctx.publish(msg);
    }
    Outcome::Stay
}
