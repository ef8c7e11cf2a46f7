// Menu contexts and the session that tracks the active one

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::completion::CompletionTree;
use super::menus;
use crate::backend::{Backend, Module, OptionMap};

/// Menu the console is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuContext {
    Main,
    Module,
    Agent,
    Listener,
    ListenersMain,
    ListenerSetup,
}

impl fmt::Display for MenuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuContext::Main => write!(f, "main"),
            MenuContext::Module => write!(f, "module"),
            MenuContext::Agent => write!(f, "agent"),
            MenuContext::Listener => write!(f, "listener"),
            MenuContext::ListenersMain => write!(f, "listenersmain"),
            MenuContext::ListenerSetup => write!(f, "listenersetup"),
        }
    }
}

/// Snapshot of the listener being interacted with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRef {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub protocol: String,
}

/// Resource in focus for the active context
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Module(Module),
    Agent(Uuid),
    Listener(ListenerRef),
    /// Listener being configured before creation
    ListenerDraft { protocol: String, options: OptionMap },
}

impl Selection {
    pub fn agent(&self) -> Option<Uuid> {
        match self {
            Selection::Agent(id) => Some(*id),
            _ => None,
        }
    }

    pub fn module(&self) -> Option<&Module> {
        match self {
            Selection::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn module_mut(&mut self) -> Option<&mut Module> {
        match self {
            Selection::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn listener(&self) -> Option<&ListenerRef> {
        match self {
            Selection::Listener(listener) => Some(listener),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<(&str, &OptionMap)> {
        match self {
            Selection::ListenerDraft { protocol, options } => Some((protocol, options)),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut OptionMap> {
        match self {
            Selection::ListenerDraft { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Whether this selection is the kind `context` requires.
    fn fits(&self, context: MenuContext) -> bool {
        matches!(
            (context, self),
            (MenuContext::Main, Selection::None)
                | (MenuContext::ListenersMain, Selection::None)
                | (MenuContext::Module, Selection::Module(_))
                | (MenuContext::Agent, Selection::Agent(_))
                | (MenuContext::Listener, Selection::Listener(_))
                | (MenuContext::ListenerSetup, Selection::ListenerDraft { .. })
        )
    }
}

/// Console state threaded through dispatch: active context, its
/// selection, and the prompt and completion tree derived from them.
///
/// All three change together in [`Session::transition`].
pub struct Session {
    context: MenuContext,
    selection: Selection,
    prompt: String,
    tree: Arc<CompletionTree>,
    prompt_name: String,
    backend: Backend,
}

impl Session {
    pub fn new(prompt_name: impl Into<String>, backend: Backend) -> Self {
        let prompt_name = prompt_name.into();
        let tree = Arc::new(menus::completion_tree(
            MenuContext::Main,
            &Selection::None,
            &backend,
        ));
        Self {
            context: MenuContext::Main,
            selection: Selection::None,
            prompt: prompt_text(&prompt_name, MenuContext::Main, &Selection::None),
            tree,
            prompt_name,
            backend,
        }
    }

    pub fn context(&self) -> MenuContext {
        self.context
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Edit the selection in place (module or draft options). The kind of
    /// selection can only change through [`transition`](Self::transition).
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn completion(&self) -> Arc<CompletionTree> {
        Arc::clone(&self.tree)
    }

    /// Move to `context` with `selection`, rebuilding prompt and completion.
    ///
    /// Returns false and leaves the session untouched when the selection
    /// does not belong to the context.
    pub fn transition(&mut self, context: MenuContext, selection: Selection) -> bool {
        if !selection.fits(context) {
            tracing::warn!(%context, "Rejected transition with mismatched selection");
            return false;
        }

        let tree = Arc::new(menus::completion_tree(context, &selection, &self.backend));
        let prompt = prompt_text(&self.prompt_name, context, &selection);

        tracing::debug!(from = %self.context, to = %context, "Menu transition");
        self.context = context;
        self.selection = selection;
        self.prompt = prompt;
        self.tree = tree;
        true
    }
}

/// Prompt for a context, e.g. `cairn[agent][<id>]» `.
pub fn prompt_text(name: &str, context: MenuContext, selection: &Selection) -> String {
    let path = match (context, selection) {
        (MenuContext::Main, _) => String::new(),
        (MenuContext::ListenersMain, _) => "[listeners]".to_string(),
        (MenuContext::Agent, Selection::Agent(id)) => format!("[agent][{}]", id),
        (MenuContext::Module, Selection::Module(module)) => format!("[module][{}]", module.name),
        (MenuContext::ListenerSetup, Selection::ListenerDraft { protocol, .. }) => {
            format!("[listeners][{}]", protocol)
        }
        (MenuContext::Listener, Selection::Listener(listener)) => {
            format!("[listeners][{}]", listener.name)
        }
        (context, _) => format!("[{}]", context),
    };
    format!("{}{}» ", name, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("cairn", Backend::in_memory(std::env::temp_dir()))
    }

    #[test]
    fn test_starts_in_main() {
        let s = session();
        assert_eq!(s.context(), MenuContext::Main);
        assert_eq!(s.selection(), &Selection::None);
        assert_eq!(s.prompt(), "cairn» ");
    }

    #[test]
    fn test_transition_updates_prompt_and_tree() {
        let mut s = session();
        let id = Uuid::new_v4();
        assert!(s.transition(MenuContext::Agent, Selection::Agent(id)));
        assert_eq!(s.prompt(), format!("cairn[agent][{}]» ", id));
        assert!(s.completion().commands().contains(&"ps"));
        assert!(!s.completion().commands().contains(&"listeners"));
    }

    #[test]
    fn test_mismatched_selection_is_rejected() {
        let mut s = session();
        assert!(!s.transition(MenuContext::Agent, Selection::None));
        assert_eq!(s.context(), MenuContext::Main);
        assert_eq!(s.prompt(), "cairn» ");
    }

    #[test]
    fn test_leaving_clears_selection() {
        let mut s = session();
        s.transition(MenuContext::Agent, Selection::Agent(Uuid::new_v4()));
        s.transition(MenuContext::Main, Selection::None);
        assert_eq!(s.selection(), &Selection::None);
    }

    #[test]
    fn test_listener_prompts() {
        let draft = Selection::ListenerDraft {
            protocol: "https".to_string(),
            options: OptionMap::new(),
        };
        assert_eq!(
            prompt_text("cairn", MenuContext::ListenerSetup, &draft),
            "cairn[listeners][https]» "
        );
        assert_eq!(
            prompt_text("cairn", MenuContext::ListenersMain, &Selection::None),
            "cairn[listeners]» "
        );
    }
}
