//! Client inboxes for messages produced outside the dispatch task.
//!
//! Backend operations that finish out of line publish here; the console's
//! delivery task pulls from its registered inbox and forwards to the
//! render queue. Each inbox is a bounded `tokio::sync::mpsc` channel, so a
//! stalled console applies backpressure instead of growing without bound.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::message::UserMessage;
use crate::errors::BusError;

/// Interval between retries while a blocking sender waits on a full queue.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Identifier a console registers with the bus, once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ClientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Inbox {
    tx: mpsc::Sender<UserMessage>,
    /// Shared so only one consumer drains at a time.
    rx: Arc<Mutex<mpsc::Receiver<UserMessage>>>,
}

/// Multi-producer bus delivering messages to registered console clients.
///
/// Cheap to clone; all clones share the same inboxes.
#[derive(Clone)]
pub struct MessageBus {
    inboxes: Arc<DashMap<ClientId, Inbox>>,
    capacity: usize,
    publish_timeout: Duration,
}

impl MessageBus {
    pub fn new(capacity: usize, publish_timeout: Duration) -> Self {
        Self {
            inboxes: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            publish_timeout,
        }
    }

    /// Register a client inbox. A second registration of the same id fails.
    pub fn register(&self, client: ClientId) -> Result<(), BusError> {
        match self.inboxes.entry(client) {
            Entry::Occupied(_) => Err(BusError::DuplicateRegistration(client)),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.capacity);
                slot.insert(Inbox {
                    tx,
                    rx: Arc::new(Mutex::new(rx)),
                });
                tracing::debug!(%client, "Registered message bus client");
                Ok(())
            }
        }
    }

    /// Publish to one client, waiting at most the publish timeout.
    pub async fn publish_to(&self, client: ClientId, msg: UserMessage) -> Result<(), BusError> {
        let tx = self.sender_for(client)?;
        send_with_timeout(&tx, msg, self.publish_timeout).await
    }

    /// Publish to every registered client.
    ///
    /// Every inbox is attempted; the last failure (if any) is returned.
    pub async fn publish(&self, msg: UserMessage) -> Result<(), BusError> {
        let senders = self.all_senders();
        if senders.is_empty() {
            return Err(BusError::NoClients);
        }

        let mut result = Ok(());
        for tx in senders {
            if let Err(e) = send_with_timeout(&tx, msg.clone(), self.publish_timeout).await {
                tracing::warn!("Message bus publish failed: {}", e);
                result = Err(e);
            }
        }
        result
    }

    /// Blocking variant of [`publish`](Self::publish) for callers outside
    /// the async runtime.
    pub fn publish_blocking(&self, msg: UserMessage) -> Result<(), BusError> {
        let senders = self.all_senders();
        if senders.is_empty() {
            return Err(BusError::NoClients);
        }

        let mut result = Ok(());
        for tx in senders {
            if let Err(e) = send_with_deadline(&tx, msg.clone(), self.publish_timeout) {
                tracing::warn!("Message bus publish failed: {}", e);
                result = Err(e);
            }
        }
        result
    }

    /// Wait for the next message addressed to `client`.
    pub async fn next_for_client(&self, client: ClientId) -> Result<UserMessage, BusError> {
        // Clone the receiver handle out so no map shard lock is held across the await.
        let rx = self
            .inboxes
            .get(&client)
            .map(|inbox| Arc::clone(&inbox.rx))
            .ok_or(BusError::UnknownClient(client))?;

        let mut rx = rx.lock().await;
        rx.recv().await.ok_or(BusError::Closed)
    }

    fn sender_for(&self, client: ClientId) -> Result<mpsc::Sender<UserMessage>, BusError> {
        self.inboxes
            .get(&client)
            .map(|inbox| inbox.tx.clone())
            .ok_or(BusError::UnknownClient(client))
    }

    fn all_senders(&self) -> Vec<mpsc::Sender<UserMessage>> {
        self.inboxes.iter().map(|inbox| inbox.tx.clone()).collect()
    }
}

/// Send on a bounded channel from async code, giving up after `timeout`.
pub(crate) async fn send_with_timeout<T>(
    tx: &mpsc::Sender<T>,
    msg: T,
    timeout: Duration,
) -> Result<(), BusError> {
    match tx.send_timeout(msg, timeout).await {
        Ok(()) => Ok(()),
        Err(SendTimeoutError::Timeout(_)) => Err(BusError::Timeout {
            waited_ms: timeout.as_millis() as u64,
        }),
        Err(SendTimeoutError::Closed(_)) => Err(BusError::Closed),
    }
}

/// Send on a bounded channel from a blocking thread, giving up after `timeout`.
///
/// Must not be called from inside an async task: it sleeps between retries.
pub(crate) fn send_with_deadline<T>(
    tx: &mpsc::Sender<T>,
    msg: T,
    timeout: Duration,
) -> Result<(), BusError> {
    let deadline = Instant::now() + timeout;
    let mut pending = msg;

    loop {
        match tx.try_send(pending) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(BusError::Closed),
            Err(TrySendError::Full(msg)) => {
                if Instant::now() >= deadline {
                    return Err(BusError::Timeout {
                        waited_ms: timeout.as_millis() as u64,
                    });
                }
                pending = msg;
                std::thread::sleep(SEND_RETRY_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> MessageBus {
        MessageBus::new(8, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let bus = bus();
        let client = ClientId::new();

        assert!(bus.register(client).is_ok());
        assert_eq!(
            bus.register(client),
            Err(BusError::DuplicateRegistration(client))
        );
        bus.publish_to(client, UserMessage::info("still delivered"))
            .await
            .unwrap();
        let msg = bus.next_for_client(client).await.unwrap();
        assert_eq!(msg.text(), "still delivered");
    }

    #[tokio::test]
    async fn test_publish_and_consume_in_order() {
        let bus = bus();
        let client = ClientId::new();
        bus.register(client).unwrap();

        for i in 0..5 {
            bus.publish_to(client, UserMessage::info(format!("msg {}", i)))
                .await
                .unwrap();
        }

        for i in 0..5 {
            let msg = bus.next_for_client(client).await.unwrap();
            assert_eq!(msg.text(), format!("msg {}", i));
        }
    }

    #[tokio::test]
    async fn test_publish_without_clients_reports_failure() {
        let bus = bus();
        assert_eq!(
            bus.publish(UserMessage::info("nobody home")).await,
            Err(BusError::NoClients)
        );
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let bus = bus();
        let stranger = ClientId::new();
        assert_eq!(
            bus.next_for_client(stranger).await,
            Err(BusError::UnknownClient(stranger))
        );
    }

    #[tokio::test]
    async fn test_full_inbox_times_out_instead_of_blocking() {
        let bus = MessageBus::new(1, Duration::from_millis(20));
        let client = ClientId::new();
        bus.register(client).unwrap();

        bus.publish_to(client, UserMessage::info("first")).await.unwrap();
        let err = bus
            .publish_to(client, UserMessage::info("second"))
            .await
            .unwrap_err();
        assert_eq!(err, BusError::Timeout { waited_ms: 20 });
    }

    #[test]
    fn test_blocking_publish_times_out() {
        let bus = MessageBus::new(1, Duration::from_millis(20));
        let client = ClientId::new();
        bus.register(client).unwrap();

        bus.publish_blocking(UserMessage::info("first")).unwrap();
        let started = Instant::now();
        assert!(matches!(
            bus.publish_blocking(UserMessage::info("second")),
            Err(BusError::Timeout { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
