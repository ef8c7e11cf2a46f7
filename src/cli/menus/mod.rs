// Menu contexts: command handlers and completion trees for each one

mod agent;
mod listener;
mod listener_setup;
mod listeners;
mod main_menu;
mod module;

use std::sync::Arc;

use super::commands::CommandTable;
use super::completion::{CompletionTree, Node};
use super::context::{MenuContext, Selection};
use crate::backend::Backend;

pub use agent::{format_checkin_age, transport_name};

/// Add the context's own commands to its table.
pub(crate) fn register(context: MenuContext, table: &mut CommandTable) {
    match context {
        MenuContext::Main => main_menu::register(table),
        MenuContext::Module => module::register(table),
        MenuContext::Agent => agent::register(table),
        MenuContext::ListenersMain => listeners::register(table),
        MenuContext::ListenerSetup => listener_setup::register(table),
        MenuContext::Listener => listener::register(table),
    }
}

/// Completion tree for a context and its selection.
pub(crate) fn completion_tree(
    context: MenuContext,
    selection: &Selection,
    backend: &Backend,
) -> CompletionTree {
    let roots = match context {
        MenuContext::Main => main_menu::completion(backend),
        MenuContext::Module => module::completion(selection, backend),
        MenuContext::Agent => agent::completion(backend),
        MenuContext::ListenersMain => listeners::completion(backend),
        MenuContext::ListenerSetup => listener_setup::completion(selection, backend),
        MenuContext::Listener => listener::completion(selection, backend),
    };
    CompletionTree::new(roots)
}

fn words(names: &[&str]) -> Vec<Node> {
    names.iter().map(|name| Node::word(*name)).collect()
}

fn agent_ids(backend: &Backend) -> Node {
    let agents = Arc::clone(&backend.agents);
    Node::dynamic(move || Ok(agents.ids().iter().map(ToString::to_string).collect()))
}

fn module_names(backend: &Backend) -> Node {
    let modules = Arc::clone(&backend.modules);
    Node::dynamic(move || Ok(modules.names()))
}

fn listener_names(backend: &Backend) -> Node {
    let listeners = Arc::clone(&backend.listeners);
    Node::dynamic(move || Ok(listeners.names()))
}

fn listener_types(backend: &Backend) -> Node {
    let listeners = Arc::clone(&backend.listeners);
    Node::dynamic(move || Ok(listeners.types()))
}

/// Option names a listener of `protocol` accepts
fn listener_options(backend: &Backend, protocol: &str) -> Node {
    let listeners = Arc::clone(&backend.listeners);
    let protocol = protocol.to_string();
    Node::dynamic(move || {
        if protocol.is_empty() {
            anyhow::bail!("no listener protocol selected");
        }
        Ok(listeners.default_options(&protocol).into_keys().collect())
    })
}
