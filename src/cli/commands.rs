// Command dispatch
//
// Each menu context has a table from command name to handler. A line is
// split on whitespace, the first word is lowercased and looked up in the
// active context's table. Handlers never change the context directly;
// they return an `Outcome` that the shell applies.

use std::collections::HashMap;

use uuid::Uuid;

use super::context::{MenuContext, Selection, Session};
use super::help;
use super::input::{confirm, LineSource};
use super::menus;
use crate::backend::Backend;
use crate::bus::{ConsoleSender, DisplayFlags, UserMessage};
use crate::config::constants::{QUIT_QUESTION, VERSION};

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stay,
    Enter(MenuContext, Selection),
    Exit,
}

pub type Handler = fn(&mut CommandContext<'_>, &[String]) -> Outcome;

pub type CommandTable = HashMap<&'static str, Handler>;

/// Everything a handler may touch while it runs
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub backend: &'a Backend,
    pub console: &'a ConsoleSender,
    pub flags: &'a DisplayFlags,
    pub input: &'a mut dyn LineSource,
    pub dispatcher: &'a Dispatcher,
    /// Agent id from `queue <id> ...`, overriding the selected agent
    pub target: Option<Uuid>,
}

impl CommandContext<'_> {
    pub fn publish(&self, msg: UserMessage) {
        self.console.publish(msg);
    }

    /// Block on a yes/no answer from the operator.
    pub fn confirm(&mut self, question: &str) -> bool {
        confirm(&mut *self.input, self.console, question)
    }

    /// Agent the agent-menu commands act on
    pub fn agent_target(&self) -> Option<Uuid> {
        self.target.or_else(|| self.session.selection().agent())
    }
}

/// Per-context command tables, built once at startup
pub struct Dispatcher {
    tables: HashMap<MenuContext, CommandTable>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for context in [
            MenuContext::Main,
            MenuContext::Module,
            MenuContext::Agent,
            MenuContext::ListenersMain,
            MenuContext::ListenerSetup,
            MenuContext::Listener,
        ] {
            let mut table = CommandTable::new();
            register_common(&mut table);
            menus::register(context, &mut table);
            tables.insert(context, table);
        }
        Self { tables }
    }

    pub fn handler(&self, context: MenuContext, name: &str) -> Option<Handler> {
        self.tables
            .get(&context)
            .and_then(|table| table.get(name.to_lowercase().as_str()))
            .copied()
    }

    /// Run one input line in the session's current context.
    pub fn dispatch(&self, ctx: &mut CommandContext<'_>, line: &str) -> Outcome {
        let words: Vec<String> = line.split_whitespace().map(String::from).collect();
        let Some(first) = words.first() else {
            return Outcome::Stay;
        };

        let context = ctx.session.context();
        match self.handler(context, first) {
            Some(handler) => {
                tracing::debug!(%context, command = %first, "Dispatching command");
                handler(ctx, &words)
            }
            None => unknown_command(ctx, &words),
        }
    }
}

fn register_common(table: &mut CommandTable) {
    table.insert("help", show_help);
    table.insert("?", show_help);
    table.insert("main", main_menu);
    table.insert("quit", quit);
}

fn unknown_command(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    tracing::debug!(command = %args[0], "Unknown command");
    ctx.publish(UserMessage::info(format!("Unknown command: {}", args[0])));
    Outcome::Stay
}

fn show_help(ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    let context = ctx.session.context();
    if context == MenuContext::Main {
        ctx.publish(UserMessage::plain(format!("Cairn console (version {})", VERSION)));
    }
    ctx.publish(UserMessage::plain(help::help_table(context)));
    Outcome::Stay
}

fn main_menu(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Outcome {
    Outcome::Enter(MenuContext::Main, Selection::None)
}

/// `quit [-y]`
fn quit(ctx: &mut CommandContext<'_>, args: &[String]) -> Outcome {
    if skip_confirmation(args) || ctx.confirm(QUIT_QUESTION) {
        Outcome::Exit
    } else {
        Outcome::Stay
    }
}

/// True when the second word is `-y`
pub fn skip_confirmation(args: &[String]) -> bool {
    args.get(1).is_some_and(|arg| arg.eq_ignore_ascii_case("-y"))
}

/// Words after the command joined with single spaces
pub fn joined_args(args: &[String]) -> String {
    args.get(1..).unwrap_or_default().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_lookup_is_case_folded() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.handler(MenuContext::Main, "LISTENERS").is_some());
        assert!(dispatcher.handler(MenuContext::Agent, "Ps").is_some());
        assert!(dispatcher.handler(MenuContext::Main, "ps").is_none());
    }

    #[test]
    fn test_common_commands_everywhere() {
        let dispatcher = Dispatcher::new();
        for context in [
            MenuContext::Main,
            MenuContext::Module,
            MenuContext::Agent,
            MenuContext::ListenersMain,
            MenuContext::ListenerSetup,
            MenuContext::Listener,
        ] {
            for name in ["help", "?", "main", "quit"] {
                assert!(
                    dispatcher.handler(context, name).is_some(),
                    "{} in {}",
                    name,
                    context
                );
            }
        }
    }

    #[test]
    fn test_skip_confirmation_flag() {
        assert!(skip_confirmation(&words("quit -y")));
        assert!(skip_confirmation(&words("quit -Y")));
        assert!(!skip_confirmation(&words("quit")));
        assert!(!skip_confirmation(&words("quit now")));
    }

    #[test]
    fn test_joined_args() {
        assert_eq!(joined_args(&words("delete my  listener")), "my listener");
        assert_eq!(joined_args(&words("delete")), "");
    }
}
