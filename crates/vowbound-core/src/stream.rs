//! Change-stream abstraction: the "subscribe" half of the persistence
//! collaborator.
//!
//! Delivery is in append order per store. A [`Subscription`] stops receiving
//! once it is released or dropped; the publishing side prunes closed
//! subscribers lazily on the next publish.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Selects which appended events a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFilter {
    /// Every event in the store.
    All,
    /// Events of a single aggregate stream.
    Aggregate(Uuid),
    /// Events whose type starts with the prefix, e.g. `"session."`.
    EventTypePrefix(String),
}

impl StreamFilter {
    /// Returns `true` if `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &StoredEvent) -> bool {
        match self {
            Self::All => true,
            Self::Aggregate(id) => event.aggregate_id == *id,
            Self::EventTypePrefix(prefix) => event.event_type.starts_with(prefix.as_str()),
        }
    }
}

/// A releasable handle on a change stream.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<StoredEvent>,
}

impl Subscription {
    /// Wraps the receiving end of a subscriber channel.
    #[must_use]
    pub fn new(id: Uuid, receiver: mpsc::UnboundedReceiver<StoredEvent>) -> Self {
        Self { id, receiver }
    }

    /// The subscription identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the next event. Returns `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<StoredEvent> {
        self.receiver.recv().await
    }

    /// Returns the next already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<StoredEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drains every already-delivered event.
    pub fn drain(&mut self) -> Vec<StoredEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stops delivery. Events already buffered are discarded.
    pub fn release(mut self) {
        self.receiver.close();
    }
}

/// Store-side registry of live subscribers.
#[derive(Debug, Default)]
pub struct SubscriberSet {
    subscribers: Mutex<Vec<(StreamFilter, mpsc::UnboundedSender<StoredEvent>)>>,
}

impl SubscriberSet {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Collaborator` if the registry mutex is poisoned.
    pub fn register(&self, filter: StreamFilter) -> Result<Subscription, DomainError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|e| DomainError::Collaborator(format!("subscriber mutex poisoned: {e}")))?
            .push((filter, sender));
        Ok(Subscription::new(Uuid::new_v4(), receiver))
    }

    /// Delivers `events` to every matching subscriber, dropping subscribers
    /// whose handle was released.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Collaborator` if the registry mutex is poisoned.
    pub fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| DomainError::Collaborator(format!("subscriber mutex poisoned: {e}")))?;
        subscribers.retain(|(filter, sender)| {
            events
                .iter()
                .filter(|event| filter.matches(event))
                .all(|event| sender.send(event.clone()).is_ok())
                && !sender.is_closed()
        });
        Ok(())
    }

    /// Number of subscribers still registered.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Returns `true` if no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Push notifications for appended events.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Opens a subscription receiving every event appended after this call
    /// that passes `filter`.
    async fn subscribe(&self, filter: StreamFilter) -> Result<Subscription, DomainError>;
}
