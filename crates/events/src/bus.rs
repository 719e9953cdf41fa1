//! Fan-out bus for formainframe events.
//!
//! [`EventSender`] handles publish straight into a tokio broadcast channel,
//! so every subscriber sees every event published after it subscribed, in
//! publication order. Subscribers filter by topic on their side with
//! [`EventReceiver::recv_topic`].

use crate::event::{EventCategory, EventSource, MfEvent};
use crate::metadata::correlation_id;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Events a slow subscriber may fall behind by before it starts losing them.
const DEFAULT_BROADCAST_CAPACITY: usize = 1000;

/// Broadcast bus shared by the data-operations components and their hosts.
///
/// Once [`shutdown`](Self::shutdown) is called, or the bus is dropped, every
/// sender refuses new events.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<MfEvent>,
    open: Arc<AtomicBool>,
}

impl EventBus {
    /// Bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Bus keeping up to `capacity` events per lagging subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Publishing handle, or `None` after shutdown.
    #[must_use]
    pub fn sender(&self) -> Option<EventSender> {
        self.open.load(Ordering::SeqCst).then(|| EventSender {
            tx: self.tx.clone(),
            open: Arc::clone(&self.open),
        })
    }

    /// Close the bus for publishing. Idempotent.
    pub fn shutdown(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::debug!(subscribers = self.subscriber_count(), "Event bus closed");
        }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Cloneable publishing handle of an [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: broadcast::Sender<MfEvent>,
    open: Arc<AtomicBool>,
}

impl EventSender {
    /// Publish a fully built event.
    ///
    /// Having no subscriber is not an error.
    ///
    /// # Errors
    ///
    /// Fails when the bus was shut down or dropped.
    pub fn send(&self, event: MfEvent) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        if self.tx.send(event).is_err() {
            tracing::trace!("Event published without subscribers");
        }
        Ok(())
    }

    /// Publish `category` from `target`, tagged with the session correlation id.
    ///
    /// # Errors
    ///
    /// Fails when the bus was shut down or dropped.
    pub fn publish(
        &self,
        target: impl Into<String>,
        category: EventCategory,
    ) -> Result<(), SendError> {
        self.send(MfEvent::new(
            correlation_id(),
            EventSource::new(target),
            category,
        ))
    }

    /// Whether publishing will fail.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }
}

/// Subscription to an [`EventBus`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: broadcast::Receiver<MfEvent>,
}

impl EventReceiver {
    /// Next event, waiting for it.
    ///
    /// A receiver that fell behind skips the events it lost. Returns `None`
    /// once every sender is gone.
    pub async fn recv(&mut self) -> Option<MfEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event whose category belongs to `topic`.
    pub async fn recv_topic(&mut self, topic: &str) -> Option<MfEvent> {
        while let Some(event) = self.recv().await {
            if event.topic() == topic {
                return Some(event);
            }
        }
        None
    }

    /// Next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<MfEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber fell behind");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Publishing to a closed bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The bus was shut down or dropped.
    #[error("event bus is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ConfigEvent, CredentialsEvent, SyncEvent};

    fn credentials_changed(uuid: &str) -> EventCategory {
        EventCategory::Credentials(CredentialsEvent::Changed {
            connection_uuid: uuid.to_string(),
        })
    }

    #[tokio::test]
    async fn test_published_event_reaches_subscriber() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();
        let mut receiver = bus.subscribe();

        sender
            .publish("formainframe::credentials", credentials_changed("c1"))
            .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.category, credentials_changed("c1"));
        assert_eq!(received.source.target, "formainframe::credentials");
        assert_eq!(received.correlation_id, correlation_id());
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_the_event() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();
        let (mut first, mut second) = (bus.subscribe(), bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        let event = MfEvent::new(
            correlation_id(),
            EventSource::new("formainframe::test"),
            credentials_changed("c2"),
        );
        let id = event.id;
        sender.send(event).unwrap();

        assert_eq!(first.recv().await.unwrap().id, id);
        assert_eq!(second.recv().await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_recv_topic_skips_other_topics() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();
        let mut receiver = bus.subscribe();
        let saved = EventCategory::Sync(SyncEvent::AutoSyncFile { file: "/a".into() });

        sender
            .publish(
                "formainframe::config",
                EventCategory::Config(ConfigEvent::Changed { key: "autoSync".into() }),
            )
            .unwrap();
        sender.publish("formainframe::sync", saved.clone()).unwrap();

        assert_eq!(receiver.recv_topic("sync").await.unwrap().category, saved);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();
        assert!(sender.publish("formainframe::test", credentials_changed("c3")).is_ok());
        assert!(EventBus::new().subscribe().try_recv().is_none());
    }

    #[test]
    fn test_shutdown_closes_existing_senders() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();

        bus.shutdown();
        bus.shutdown();

        assert!(bus.sender().is_none());
        assert!(sender.is_closed());
        assert_eq!(
            sender.publish("formainframe::test", credentials_changed("c4")),
            Err(SendError::Closed)
        );
    }

    #[test]
    fn test_dropped_bus_closes_senders() {
        let sender = EventBus::new().sender().unwrap();
        assert!(sender.is_closed());
        assert_eq!(SendError::Closed.to_string(), "event bus is closed");
    }

    #[tokio::test]
    async fn test_events_keep_publication_order() {
        let bus = EventBus::new();
        let sender = bus.sender().unwrap();
        let mut receiver = bus.subscribe();

        for uuid in ["a", "b", "c"] {
            sender.publish("formainframe::test", credentials_changed(uuid)).unwrap();
        }
        for uuid in ["a", "b", "c"] {
            assert_eq!(receiver.recv().await.unwrap().category, credentials_changed(uuid));
        }
    }
}
