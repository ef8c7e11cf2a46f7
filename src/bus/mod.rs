//! Message bus: ordered delivery of leveled notifications to the console.
//!
//! Two bounded queues, each drained by one task:
//! - client inboxes ([`MessageBus`]) filled by out-of-line backend calls
//!   and drained by the delivery task,
//! - the render queue ([`ConsoleSender`]) filled by the dispatch task and
//!   the delivery task and drained by the printer task.

pub mod console;
pub mod message;
pub mod printer;
pub mod queue;

pub use console::{render_queue, spawn_delivery, ConsoleReceiver, ConsoleSender};
pub use message::{MessageLevel, UserMessage};
pub use printer::{render_line, spawn_printer, DisplayFlags, Printer};
pub use queue::{ClientId, MessageBus};
