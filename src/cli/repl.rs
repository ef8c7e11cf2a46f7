// Console shell loop
//
// Reads a line, dispatches it in the active context and applies the
// handler's outcome. Runs on a blocking thread; messages reach the
// terminal through the render queue.

use std::sync::Arc;

use super::commands::{CommandContext, Dispatcher, Outcome};
use super::context::Session;
use super::input::{confirm, LineSource, ReadOutcome};
use crate::backend::Backend;
use crate::bus::{ConsoleSender, DisplayFlags, UserMessage};
use crate::config::constants::QUIT_QUESTION;
use crate::errors::ConsoleError;

/// Why the shell loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// Operator confirmed quitting
    Quit,
    /// Input stream closed
    EndOfInput,
}

pub struct Shell<S: LineSource> {
    session: Session,
    dispatcher: Dispatcher,
    backend: Backend,
    console: ConsoleSender,
    flags: Arc<DisplayFlags>,
    input: S,
}

impl<S: LineSource + 'static> Shell<S> {
    pub fn new(
        prompt_name: impl Into<String>,
        backend: Backend,
        console: ConsoleSender,
        flags: Arc<DisplayFlags>,
        input: S,
    ) -> Self {
        Self {
            session: Session::new(prompt_name, backend.clone()),
            dispatcher: Dispatcher::new(),
            backend,
            console,
            flags,
            input,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn input(&self) -> &S {
        &self.input
    }

    /// Run one line in the current context and apply the outcome.
    pub fn execute(&mut self, line: &str) -> Outcome {
        let outcome = {
            let mut ctx = CommandContext {
                session: &mut self.session,
                backend: &self.backend,
                console: &self.console,
                flags: &self.flags,
                input: &mut self.input,
                dispatcher: &self.dispatcher,
                target: None,
            };
            self.dispatcher.dispatch(&mut ctx, line)
        };

        if let Outcome::Enter(context, selection) = &outcome {
            if !self.session.transition(*context, selection.clone()) {
                self.console.publish(UserMessage::failure(format!(
                    "Cannot enter the {} menu with that selection",
                    context
                )));
            }
        }
        outcome
    }

    /// Read and execute lines until the operator quits or input ends.
    pub fn run(&mut self) -> Result<ShellExit, ConsoleError> {
        let exit = self.read_loop();
        if let Err(e) = self.input.save_history() {
            tracing::warn!("Failed to save history: {}", e);
        }
        exit
    }

    fn read_loop(&mut self) -> Result<ShellExit, ConsoleError> {
        loop {
            self.input.set_completion(self.session.completion());
            let prompt = self.session.prompt().to_string();

            match self.input.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.input.add_history(line);
                    if self.execute(line) == Outcome::Exit {
                        return Ok(ShellExit::Quit);
                    }
                }
                ReadOutcome::Interrupted => {
                    if confirm(&mut self.input, &self.console, QUIT_QUESTION) {
                        return Ok(ShellExit::Quit);
                    }
                }
                ReadOutcome::Eof => {
                    tracing::debug!(context = %self.session.context(), "Input closed");
                    return Ok(ShellExit::EndOfInput);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::render_queue;
    use crate::cli::context::MenuContext;
    use crate::cli::input::ScriptedSource;
    use std::time::Duration;

    fn shell(lines: &[&str]) -> (Shell<ScriptedSource>, crate::bus::ConsoleReceiver) {
        let (tx, rx) = render_queue(64, Duration::from_millis(10));
        let backend = Backend::in_memory(std::env::temp_dir().join("cairn-no-modules"));
        let input = ScriptedSource::new(lines.iter().copied());
        let shell = Shell::new("cairn", backend, tx, Arc::new(DisplayFlags::default()), input);
        (shell, rx)
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (mut shell, mut rx) = shell(&["", "   "]);
        assert_eq!(shell.run().unwrap(), ShellExit::EndOfInput);
        assert!(rx.try_recv().is_none());
        assert!(shell.input().history().is_empty());
    }

    #[test]
    fn test_interrupt_then_yes_quits() {
        let (mut shell, _rx) = shell(&[]);
        shell.input.push(ReadOutcome::Interrupted);
        shell.input.push(ReadOutcome::Line("yes".into()));
        assert_eq!(shell.run().unwrap(), ShellExit::Quit);
    }

    #[test]
    fn test_listeners_and_back() {
        let (mut shell, _rx) = shell(&[]);
        shell.execute("listeners");
        assert_eq!(shell.session().prompt(), "cairn[listeners]» ");
        shell.execute("back");
        assert_eq!(shell.session().context(), MenuContext::Main);
    }
}
