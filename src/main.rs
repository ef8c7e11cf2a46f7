// Cairn - operator console
// Main entry point

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cairn::backend::memory::MemoryBackend;
use cairn::bus::{
    render_queue, spawn_delivery, spawn_printer, ClientId, DisplayFlags, MessageBus, Printer,
    UserMessage,
};
use cairn::cli::{signals, EditorSource, Shell, ShellExit};
use cairn::config::constants::VERSION;
use cairn::config::load_config;

/// How long shutdown waits for the printer to drain the render queue
const PRINTER_DRAIN: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "cairn", about = "Cairn operator console", version = VERSION)]
struct Args {
    /// Config file (default: ~/.cairn/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show debug messages in the console
    #[arg(short, long)]
    debug: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding module definitions
    #[arg(long)]
    modules_dir: Option<PathBuf>,

    /// Line history file
    #[arg(long)]
    history: Option<PathBuf>,

    /// JSON array of agents to check in at startup
    #[arg(long)]
    agents: Option<PathBuf>,
}

fn init_tracing(args: &Args) {
    // Diagnostics go to stderr so they never interleave with the prompt's stdout.
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CAIRN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("{},rustyline=warn", default_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mut config = load_config(args.config.as_deref())?;
    config.debug |= args.debug;
    config.verbose |= args.verbose;
    if let Some(dir) = args.modules_dir {
        config.modules_dir = dir;
    }
    if let Some(history) = args.history {
        config.history_file = history;
    }
    if let Some(agents) = args.agents {
        config.agents_file = Some(agents);
    }

    let publish_timeout = Duration::from_millis(config.bus.publish_timeout_ms);
    let bus = MessageBus::new(config.bus.capacity, publish_timeout);
    let (console, console_rx) = render_queue(config.bus.capacity, publish_timeout);

    let flags = Arc::new(DisplayFlags::new(config.debug, config.verbose));
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let printer = spawn_printer(console_rx, Printer::new(stdout, Arc::clone(&flags), color));

    let client = ClientId::new();
    bus.register(client)
        .context("Failed to register the console with the message bus")?;
    console
        .send_async(UserMessage::debug(format!(
            "Registered console client {} with the message bus",
            client
        )))
        .await?;
    let delivery = spawn_delivery(bus.clone(), client, console.clone());

    signals::install().context("Failed to install the signal handler")?;

    let memory = MemoryBackend::new(config.modules_dir.clone(), Some(bus.clone()));
    if let Some(path) = config.agents_file.clone() {
        let agents = Arc::clone(&memory.agents);
        let count = tokio::task::spawn_blocking(move || agents.check_in_from_file(&path))
            .await
            .context("Agent check-in task failed")??;
        tracing::info!(count, "Checked in agents from file");
    }
    let backend = memory.backend();
    let history_file = config.history_file.clone();
    let prompt_name = config.prompt_name.clone();
    let shell_console = console.clone();
    let shell_flags = Arc::clone(&flags);

    tracing::info!(version = VERSION, "Console starting");
    let exit = tokio::task::spawn_blocking(move || {
        let input = EditorSource::new(history_file)?;
        Shell::new(prompt_name, backend, shell_console, shell_flags, input).run()
    })
    .await
    .context("Console task failed")??;

    match exit {
        ShellExit::Quit => tracing::info!("Operator quit the console"),
        ShellExit::EndOfInput => tracing::info!("Console input closed"),
    }

    // Let queued output reach the terminal before the process ends.
    delivery.abort();
    drop(console);
    drop(bus);
    if tokio::time::timeout(PRINTER_DRAIN, printer).await.is_err() {
        tracing::debug!("Printer still busy at shutdown");
    }

    signals::exit_process()
}
