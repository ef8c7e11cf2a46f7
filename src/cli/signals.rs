// OS signal handling
//
// Interrupt and termination signals that arrive outside the line editor
// (while a handler is blocked, for instance) get the same confirm-then-exit
// treatment as `quit`.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

use super::input::is_affirmative;
use crate::config::constants::QUIT_QUESTION;

/// Install the process-wide signal handler. Call once at startup.
pub fn install() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        tracing::debug!("Received termination signal");
        match ask(QUIT_QUESTION) {
            Ok(true) => exit_process(),
            Ok(false) => {}
            Err(e) => tracing::warn!("There was an error reading the input: {}", e),
        }
    })
}

fn ask(question: &str) -> io::Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "\n{} [yes/NO]: ", question)?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

/// Announce shutdown and end the process with status 0.
pub fn exit_process() -> ! {
    println!("{}", "[!] Quitting...".red());
    tracing::info!("Shutting down due to user input");
    std::process::exit(0)
}
