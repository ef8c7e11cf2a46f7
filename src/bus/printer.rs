// Console printer - the single consumer of the render queue
//
// Rendering happens in two steps: `render_line` turns a message into its
// plain console text (level prefix + text), then the printer applies
// terminal colors and writes it. Only this module knows about styling.

use crossterm::style::Stylize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::console::ConsoleReceiver;
use super::message::{MessageLevel, UserMessage};

const VERBOSE_TIME_FORMAT: &str = "%H:%M:%S";

/// Runtime display switches shared by the dispatch task and the printer.
#[derive(Debug, Default)]
pub struct DisplayFlags {
    debug: AtomicBool,
    verbose: AtomicBool,
}

impl DisplayFlags {
    pub fn new(debug: bool, verbose: bool) -> Self {
        Self {
            debug: AtomicBool::new(debug),
            verbose: AtomicBool::new(verbose),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::SeqCst);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    pub fn set_verbose(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::SeqCst);
    }
}

/// Plain console text for a message, or `None` when it is suppressed.
pub fn render_line(msg: &UserMessage, debug: bool) -> Option<String> {
    let text = msg.text();
    match msg.level() {
        MessageLevel::Plain => Some(text.to_string()),
        MessageLevel::Info => Some(format!("[i] {}", text)),
        MessageLevel::Note => Some(format!("[-] {}", text)),
        MessageLevel::Warn => Some(format!("[!] {}", text)),
        MessageLevel::Debug if debug => Some(format!("[DEBUG] {}", text)),
        MessageLevel::Debug => None,
        MessageLevel::Success => Some(format!("[+] {}", text)),
        MessageLevel::Unknown(code) => Some(format!(
            "[_-_] Invalid message level: {}\n{}",
            code, text
        )),
    }
}

fn styled(level: MessageLevel, line: String) -> String {
    match level {
        MessageLevel::Plain => line,
        MessageLevel::Info => line.cyan().to_string(),
        MessageLevel::Note => line.yellow().to_string(),
        MessageLevel::Warn | MessageLevel::Debug | MessageLevel::Unknown(_) => {
            line.red().to_string()
        }
        MessageLevel::Success => line.green().to_string(),
    }
}

/// Writes rendered messages to an output stream.
pub struct Printer<W: Write> {
    out: W,
    flags: Arc<DisplayFlags>,
    color: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, flags: Arc<DisplayFlags>, color: bool) -> Self {
        Self { out, flags, color }
    }

    /// Render and write one message. Suppressed messages write nothing.
    ///
    /// In verbose mode leveled messages carry their publish time.
    pub fn print(&mut self, msg: &UserMessage) -> io::Result<()> {
        let Some(mut line) = render_line(msg, self.flags.debug()) else {
            return Ok(());
        };
        if self.flags.verbose() && msg.level() != MessageLevel::Plain {
            line = format!("{} {}", msg.time().format(VERBOSE_TIME_FORMAT), line);
        }

        let line = if self.color {
            styled(msg.level(), line)
        } else {
            line
        };

        writeln!(self.out)?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    /// Report messages lost to a full render queue.
    pub fn report_dropped(&mut self, count: usize) -> io::Result<()> {
        self.print(&UserMessage::warn(format!(
            "{} message(s) dropped: console output queue was full",
            count
        )))
    }
}

/// Spawn the printer task: drain the render queue until every sender is gone.
pub fn spawn_printer<W>(mut receiver: ConsoleReceiver, mut printer: Printer<W>) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(msg) = receiver.recv().await {
            let dropped = receiver.take_dropped();
            if dropped > 0 {
                if let Err(e) = printer.report_dropped(dropped) {
                    tracing::warn!("Failed to write to console: {}", e);
                }
            }

            if let Err(e) = printer.print(&msg) {
                tracing::warn!("Failed to write to console: {}", e);
            }
        }
        tracing::debug!("Render queue closed, printer task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::console::render_queue;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_level_prefixes() {
        assert_eq!(render_line(&UserMessage::plain("hi"), false).unwrap(), "hi");
        assert_eq!(render_line(&UserMessage::info("hi"), false).unwrap(), "[i] hi");
        assert_eq!(render_line(&UserMessage::note("hi"), false).unwrap(), "[-] hi");
        assert_eq!(render_line(&UserMessage::warn("hi"), false).unwrap(), "[!] hi");
        assert_eq!(render_line(&UserMessage::success("hi"), false).unwrap(), "[+] hi");
        assert_eq!(
            render_line(&UserMessage::debug("hi"), true).unwrap(),
            "[DEBUG] hi"
        );
    }

    #[test]
    fn test_debug_suppressed_without_flag() {
        assert!(render_line(&UserMessage::debug("hidden"), false).is_none());
    }

    #[test]
    fn test_unknown_level_is_rendered_with_code_and_text() {
        let msg = UserMessage::new(MessageLevel::from(77), "strange payload");
        let line = render_line(&msg, false).unwrap();
        assert!(line.contains("Invalid message level"));
        assert!(line.contains("77"));
        assert!(line.contains("strange payload"));
    }

    #[test]
    fn test_printer_respects_debug_flag_changes() {
        let buffer = SharedBuffer::default();
        let flags = Arc::new(DisplayFlags::new(false, false));
        let mut printer = Printer::new(buffer.clone(), Arc::clone(&flags), false);

        printer.print(&UserMessage::debug("first")).unwrap();
        assert_eq!(buffer.contents(), "");

        flags.set_debug(true);
        printer.print(&UserMessage::debug("second")).unwrap();
        assert_eq!(buffer.contents(), "\n[DEBUG] second\n");
    }

    #[test]
    fn test_verbose_adds_publish_time() {
        let buffer = SharedBuffer::default();
        let flags = Arc::new(DisplayFlags::new(false, true));
        let mut printer = Printer::new(buffer.clone(), Arc::clone(&flags), false);

        let msg = UserMessage::note("slow listener");
        printer.print(&msg).unwrap();
        printer.print(&UserMessage::plain("table row")).unwrap();
        let stamp = msg.time().format("%H:%M:%S").to_string();
        assert_eq!(
            buffer.contents(),
            format!("\n{} [-] slow listener\n\ntable row\n", stamp)
        );

        flags.set_verbose(false);
        printer.print(&UserMessage::note("quiet")).unwrap();
        assert!(buffer.contents().ends_with("\n[-] quiet\n"));
    }

    #[tokio::test]
    async fn test_printer_task_preserves_publish_order() {
        let buffer = SharedBuffer::default();
        let flags = Arc::new(DisplayFlags::default());
        let (tx, rx) = render_queue(64, Duration::from_millis(50));
        let handle = spawn_printer(rx, Printer::new(buffer.clone(), flags, false));

        for i in 0..20 {
            tx.send_async(UserMessage::info(format!("step {}", i)))
                .await
                .unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().filter(|l| !l.is_empty()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("[i] step {}", i)).collect();
        assert_eq!(lines, expected);
    }

    #[tokio::test]
    async fn test_printer_reports_drops() {
        let buffer = SharedBuffer::default();
        let flags = Arc::new(DisplayFlags::default());
        let (tx, rx) = render_queue(1, Duration::from_millis(5));

        tx.send_async(UserMessage::info("kept")).await.unwrap();
        assert!(tx.send_async(UserMessage::info("lost")).await.is_err());
        drop(tx);

        spawn_printer(rx, Printer::new(buffer.clone(), flags, false))
            .await
            .unwrap();

        let output = buffer.contents();
        assert!(output.contains("[!] 1 message(s) dropped"));
        assert!(output.contains("[i] kept"));
        assert!(!output.contains("lost"));
    }
}
