// CLI module
// Interactive console: menus, dispatch, completion and line input

pub mod commands;
pub mod completion;
pub mod context;
pub mod help;
pub mod input;
pub mod menus;
pub mod repl;
pub mod signals;
pub mod table;

pub use commands::{CommandContext, Dispatcher, Outcome};
pub use completion::{CompletionTree, Node, ShellHelper};
pub use context::{ListenerRef, MenuContext, Selection, Session};
pub use input::{EditorSource, LineSource, ReadOutcome, ScriptedSource};
pub use repl::{Shell, ShellExit};
pub use table::Table;
