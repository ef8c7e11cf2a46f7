// Tab completion for the console
//
// Each menu context has its own tree of literal command words. Some
// branches end in a dynamic provider that is queried against the live
// registries every time completion is requested.

use std::sync::{Arc, RwLock};

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Live query for completion candidates
pub type Provider = Arc<dyn Fn() -> anyhow::Result<Vec<String>> + Send + Sync>;

/// One node of a completion tree
#[derive(Clone)]
pub enum Node {
    /// A fixed word, optionally followed by more words
    Literal { name: String, children: Vec<Node> },
    /// Candidates computed at completion time; always a leaf
    Dynamic(Provider),
}

impl Node {
    pub fn word(name: impl Into<String>) -> Self {
        Node::Literal {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Literal {
            name: name.into(),
            children,
        }
    }

    pub fn dynamic<F>(provider: F) -> Self
    where
        F: Fn() -> anyhow::Result<Vec<String>> + Send + Sync + 'static,
    {
        Node::Dynamic(Arc::new(provider))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Literal { name, children } => f
                .debug_struct("Literal")
                .field("name", name)
                .field("children", children)
                .finish(),
            Node::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

/// Completion tree for one menu context
#[derive(Debug, Clone, Default)]
pub struct CompletionTree {
    roots: Vec<Node>,
}

impl CompletionTree {
    pub fn new(roots: Vec<Node>) -> Self {
        Self { roots }
    }

    /// Top-level command words, in declaration order
    pub fn commands(&self) -> Vec<&str> {
        self.roots
            .iter()
            .filter_map(|node| match node {
                Node::Literal { name, .. } => Some(name.as_str()),
                Node::Dynamic(_) => None,
            })
            .collect()
    }

    /// Candidates for the word under the cursor.
    ///
    /// Returns the byte offset where the word starts and the ranked
    /// candidates. `line` is everything left of the cursor.
    pub fn complete(&self, line: &str) -> (usize, Vec<String>) {
        // Separators may be multi-byte (U+00A0, U+3000), so step past the whole char.
        let start = line
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(idx, c)| idx + c.len_utf8())
            .unwrap_or(0);
        let current = &line[start..];

        let mut level: &[Node] = &self.roots;
        for word in line[..start].split_whitespace() {
            match descend(level, word) {
                Some(children) => level = children,
                None => return (start, Vec::new()),
            }
        }

        (start, rank(level, current))
    }
}

fn descend<'a>(level: &'a [Node], word: &str) -> Option<&'a [Node]> {
    let literal = level.iter().find_map(|node| match node {
        Node::Literal { name, children } if name.eq_ignore_ascii_case(word) => {
            Some(children.as_slice())
        }
        _ => None,
    });

    literal.or_else(|| {
        level
            .iter()
            .any(|node| matches!(node, Node::Dynamic(_)))
            .then_some(&[][..])
    })
}

fn rank(level: &[Node], prefix: &str) -> Vec<String> {
    let folded = prefix.to_lowercase();
    let mut literals = Vec::new();
    let mut dynamic = Vec::new();

    for node in level {
        match node {
            Node::Literal { name, .. } => literals.push(name.clone()),
            Node::Dynamic(provider) => match provider() {
                Ok(values) => dynamic.extend(values),
                Err(e) => tracing::debug!("Completion provider failed: {:#}", e),
            },
        }
    }
    dynamic.sort();

    let mut seen = std::collections::HashSet::new();
    let candidates: Vec<String> = literals
        .into_iter()
        .chain(dynamic)
        .filter(|c| c.to_lowercase().starts_with(&folded))
        .filter(|c| seen.insert(c.clone()))
        .collect();

    let (exact, folded_only): (Vec<String>, Vec<String>) =
        candidates.into_iter().partition(|c| c.starts_with(prefix));
    exact.into_iter().chain(folded_only).collect()
}

/// Line editor helper that completes against the active context's tree.
///
/// The tree is swapped by the shell on every context transition.
#[derive(Clone, Default)]
pub struct ShellHelper {
    tree: Arc<RwLock<Arc<CompletionTree>>>,
}

impl ShellHelper {
    pub fn new(tree: Arc<CompletionTree>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn set_tree(&self, tree: Arc<CompletionTree>) {
        match self.tree.write() {
            Ok(mut guard) => *guard = tree,
            Err(poisoned) => *poisoned.into_inner() = tree,
        }
    }

    fn current(&self) -> Arc<CompletionTree> {
        match self.tree.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, candidates) = self.current().complete(&line[..pos]);
        let pairs = candidates
            .into_iter()
            .map(|c| Pair {
                display: c.clone(),
                replacement: format!("{} ", c),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CompletionTree {
        CompletionTree::new(vec![
            Node::branch(
                "agent",
                vec![
                    Node::word("list"),
                    Node::branch(
                        "interact",
                        vec![Node::dynamic(|| {
                            Ok(vec!["b-agent".to_string(), "a-agent".to_string()])
                        })],
                    ),
                ],
            ),
            Node::word("banner"),
            Node::word("Back"),
            Node::word("back"),
        ])
    }

    #[test]
    fn test_top_level_prefix() {
        let (start, candidates) = tree().complete("ba");
        assert_eq!(start, 0);
        assert_eq!(candidates, vec!["banner", "back", "Back"]);
    }

    #[test]
    fn test_empty_line_lists_all_commands() {
        let (_, candidates) = tree().complete("");
        assert_eq!(candidates, vec!["agent", "banner", "Back", "back"]);
    }

    #[test]
    fn test_nested_literal() {
        let (start, candidates) = tree().complete("agent l");
        assert_eq!(start, 6);
        assert_eq!(candidates, vec!["list"]);
    }

    #[test]
    fn test_multibyte_separator() {
        let (start, candidates) = tree().complete("agent\u{a0}l");
        assert_eq!(start, "agent\u{a0}".len());
        assert_eq!(candidates, vec!["list"]);

        let (start, candidates) = tree().complete("agent\u{3000}");
        assert_eq!(start, "agent\u{3000}".len());
        assert_eq!(candidates, vec!["list", "interact"]);
    }

    #[test]
    fn test_dynamic_results_sorted() {
        let (_, candidates) = tree().complete("AGENT interact ");
        assert_eq!(candidates, vec!["a-agent", "b-agent"]);
    }

    #[test]
    fn test_unknown_path_has_no_candidates() {
        let (_, candidates) = tree().complete("nothing here");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_past_dynamic_leaf_has_no_candidates() {
        let (_, candidates) = tree().complete("agent interact a-agent ");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_provider_error_yields_nothing() {
        let failing = CompletionTree::new(vec![Node::branch(
            "use",
            vec![Node::dynamic(|| anyhow::bail!("registry offline"))],
        )]);
        let (_, candidates) = failing.complete("use ");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_provider_queried_every_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let live = CompletionTree::new(vec![Node::branch(
            "interact",
            vec![Node::dynamic(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![format!("agent-{}", n)])
            })],
        )]);

        assert_eq!(live.complete("interact ").1, vec!["agent-0"]);
        assert_eq!(live.complete("interact ").1, vec!["agent-1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_helper_swaps_tree() {
        let helper = ShellHelper::new(Arc::new(tree()));
        assert_eq!(helper.current().commands()[0], "agent");
        helper.set_tree(Arc::new(CompletionTree::new(vec![Node::word("list")])));
        assert_eq!(helper.current().commands(), vec!["list"]);
    }
}
