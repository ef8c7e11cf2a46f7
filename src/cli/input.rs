// Line input for the console
//
// The shell reads through the `LineSource` trait so the interactive editor
// and scripted input (tests, piped sessions) share one dispatch loop.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Cmd, CompletionType, Config as EditorConfig, EditMode, Editor, KeyEvent};

use super::completion::{CompletionTree, ShellHelper};
use crate::bus::{ConsoleSender, UserMessage};
use crate::errors::ConsoleError;

/// Result of one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Input stream closed (Ctrl-D)
    Eof,
}

/// A source of input lines
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError>;

    /// Completion tree for subsequent reads
    fn set_completion(&mut self, _tree: Arc<CompletionTree>) {}

    fn add_history(&mut self, _line: &str) {}

    fn save_history(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }
}

/// Answers that confirm a yes/no question
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "-y"
    )
}

/// Ask a yes/no question on `input`. Anything but a yes is a no.
pub fn confirm(input: &mut dyn LineSource, console: &ConsoleSender, question: &str) -> bool {
    let prompt = format!("{} [yes/NO]: ", question);
    match input.read_line(&prompt) {
        Ok(ReadOutcome::Line(answer)) => is_affirmative(&answer),
        Ok(ReadOutcome::Interrupted) | Ok(ReadOutcome::Eof) => false,
        Err(e) => {
            console.publish(
                UserMessage::warn(format!("There was an error reading the input: {}", e))
                    .with_error(true),
            );
            false
        }
    }
}

/// Interactive line editor with completion and persistent history
pub struct EditorSource {
    editor: Editor<ShellHelper, DefaultHistory>,
    helper: ShellHelper,
    history_file: PathBuf,
}

impl EditorSource {
    pub fn new(history_file: PathBuf) -> Result<Self, ConsoleError> {
        let config = EditorConfig::builder()
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .history_ignore_space(true)
            .history_ignore_dups(true)
            .map_err(|e| ConsoleError::Editor(e.to_string()))?
            .build();

        let mut editor = Editor::<ShellHelper, DefaultHistory>::with_config(config)
            .map_err(|e| ConsoleError::Editor(e.to_string()))?;

        let helper = ShellHelper::default();
        editor.set_helper(Some(helper.clone()));
        // No job control from the console prompt
        editor.bind_sequence(KeyEvent::ctrl('Z'), Cmd::Noop);

        if let Some(parent) = history_file.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Cannot create history directory {}: {}", parent.display(), e);
            }
        }
        if editor.load_history(&history_file).is_err() {
            tracing::debug!("No previous history at {}", history_file.display());
        }

        Ok(Self {
            editor,
            helper,
            history_file,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(ConsoleError::Read(e.to_string())),
        }
    }

    fn set_completion(&mut self, tree: Arc<CompletionTree>) {
        self.helper.set_tree(tree);
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::debug!("History entry not recorded: {}", e);
        }
    }

    fn save_history(&mut self) -> Result<(), ConsoleError> {
        self.editor
            .save_history(&self.history_file)
            .map_err(|e| ConsoleError::History {
                path: self.history_file.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Replays prepared input; reports end-of-input once exhausted.
///
/// Every prompt shown is recorded so callers can check what the console
/// asked for.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<ReadOutcome>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = Self::default();
        for line in lines {
            source.push(ReadOutcome::Line(line.into()));
        }
        source
    }

    /// Queue one more read result.
    pub fn push(&self, outcome: ReadOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Lines recorded as history
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        lock(&self.prompts).push(prompt.to_string());
        Ok(lock(&self.script).pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn add_history(&mut self, line: &str) {
        lock(&self.history).push(line.to_string());
    }
}
