// Render queue between message producers and the console printer
//
// The dispatch task and the delivery task both feed this queue; the
// printer task is its only consumer. Sends wait a bounded time on a full
// queue, then count the message as dropped so the printer can say so.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::message::UserMessage;
use super::queue::{send_with_deadline, send_with_timeout, ClientId, MessageBus};
use crate::errors::BusError;

/// Create a render queue with the given capacity and send timeout.
pub fn render_queue(capacity: usize, timeout: Duration) -> (ConsoleSender, ConsoleReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));

    (
        ConsoleSender {
            tx,
            timeout,
            dropped: Arc::clone(&dropped),
        },
        ConsoleReceiver { rx, dropped },
    )
}

/// Producer handle for the render queue. Cheap to clone.
#[derive(Clone)]
pub struct ConsoleSender {
    tx: mpsc::Sender<UserMessage>,
    timeout: Duration,
    dropped: Arc<AtomicUsize>,
}

impl ConsoleSender {
    /// Send from a blocking thread (the dispatch task).
    pub fn send(&self, msg: UserMessage) -> Result<(), BusError> {
        let result = send_with_deadline(&self.tx, msg, self.timeout);
        self.note_failure(&result);
        result
    }

    /// Send from async code (the delivery task, out-of-line backend calls).
    pub async fn send_async(&self, msg: UserMessage) -> Result<(), BusError> {
        let result = send_with_timeout(&self.tx, msg, self.timeout).await;
        self.note_failure(&result);
        result
    }

    /// Send and log instead of returning the failure.
    ///
    /// Used by command handlers: a dropped message is already counted and
    /// reported by the printer, so the handler carries on.
    pub fn publish(&self, msg: UserMessage) {
        if let Err(e) = self.send(msg) {
            tracing::warn!("Console message not delivered: {}", e);
        }
    }

    fn note_failure(&self, result: &Result<(), BusError>) {
        if let Err(BusError::Timeout { .. }) = result {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Consumer half of the render queue, owned by the printer task.
pub struct ConsoleReceiver {
    rx: mpsc::Receiver<UserMessage>,
    dropped: Arc<AtomicUsize>,
}

impl ConsoleReceiver {
    /// Wait for the next message. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<UserMessage> {
        self.rx.recv().await
    }

    /// Non-blocking receive, used by tests and shutdown draining.
    pub fn try_recv(&mut self) -> Option<UserMessage> {
        self.rx.try_recv().ok()
    }

    /// Number of messages dropped since the last call, resetting the count.
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::SeqCst)
    }
}

/// Spawn the delivery task: pull each message from the client's bus inbox
/// and hand it to the render queue.
///
/// Runs until the inbox or the render queue closes.
pub fn spawn_delivery(bus: MessageBus, client: ClientId, console: ConsoleSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(%client, "Delivery task started");
        loop {
            let msg = match bus.next_for_client(client).await {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("Delivery task stopping: {}", e);
                    break;
                }
            };

            match console.send_async(msg).await {
                Ok(()) => {}
                Err(BusError::Closed) => {
                    tracing::debug!("Render queue closed, delivery task exiting");
                    break;
                }
                Err(e) => tracing::warn!("Delivered message not rendered: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_preserves_order() {
        let (tx, mut rx) = render_queue(16, Duration::from_millis(10));

        tx.send(UserMessage::info("one")).unwrap();
        tx.send(UserMessage::warn("two")).unwrap();
        tx.send(UserMessage::success("three")).unwrap();

        let texts: Vec<String> = std::iter::from_fn(|| rx.try_recv())
            .map(|m| m.text().to_string())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_full_queue_counts_drop() {
        let (tx, rx) = render_queue(1, Duration::from_millis(10));

        tx.send(UserMessage::info("fits")).unwrap();
        assert!(matches!(
            tx.send(UserMessage::info("overflow")),
            Err(BusError::Timeout { .. })
        ));

        assert_eq!(rx.take_dropped(), 1);
        assert_eq!(rx.take_dropped(), 0);
    }

    #[tokio::test]
    async fn test_delivery_forwards_bus_messages() {
        let bus = MessageBus::new(8, Duration::from_millis(50));
        let client = ClientId::new();
        bus.register(client).unwrap();

        let (tx, mut rx) = render_queue(8, Duration::from_millis(50));
        let handle = spawn_delivery(bus.clone(), client, tx);

        bus.publish(UserMessage::note("listener started")).await.unwrap();
        bus.publish(UserMessage::success("agent checked in")).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.text(), "listener started");
        assert_eq!(second.text(), "agent checked in");

        handle.abort();
    }

    #[test]
    fn test_closed_queue() {
        let (tx, rx) = render_queue(4, Duration::from_millis(10));
        drop(rx);
        assert_eq!(tx.send(UserMessage::info("late")), Err(BusError::Closed));
    }
}
