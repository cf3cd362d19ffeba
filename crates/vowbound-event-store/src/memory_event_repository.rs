//! In-process event store.
//!
//! Used when no database is configured and by the engine's integration
//! tests. Appends are checked against the stream head like the PostgreSQL
//! store; a re-sent batch whose event ids are already stored is accepted as
//! a no-op so outbound sync stays idempotent.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};
use vowbound_core::stream::{EventStream, StreamFilter, SubscriberSet, Subscription};

/// Event store backed by a process-local map of streams.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
    subscribers: SubscriberSet,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events across all streams.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.streams.lock().unwrap().values().map(Vec::len).sum()
    }

    fn poisoned(e: impl std::fmt::Display) -> DomainError {
        DomainError::Collaborator(format!("event store mutex poisoned: {e}"))
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self.streams.lock().map_err(Self::poisoned)?;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().map_err(Self::poisoned)?;
        let stream = streams.entry(aggregate_id).or_default();

        if !events.is_empty()
            && events
                .iter()
                .all(|e| stream.iter().any(|s| s.event_id == e.event_id))
        {
            debug!(%aggregate_id, "batch already stored, ignoring resend");
            return Ok(());
        }

        let actual = stream.last().map_or(0, |e| e.sequence_number);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        // Published under the stream lock so delivery order is append order.
        self.subscribers.publish(events)
    }
}

#[async_trait]
impl EventStream for InMemoryEventRepository {
    async fn subscribe(&self, filter: StreamFilter) -> Result<Subscription, DomainError> {
        self.subscribers.register(filter)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            event_type: "session.turn_advanced".to_owned(),
            payload: serde_json::json!({ "round": 1 }),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_load_events_returns_empty_vec_for_unknown_aggregate() {
        let repo = InMemoryEventRepository::new();

        let events = repo.load_events(Uuid::new_v4()).await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load_preserves_order() {
        let repo = InMemoryEventRepository::new();
        let id = Uuid::new_v4();
        let events = vec![make_stored_event(id, 1), make_stored_event(id, 2)];

        repo.append_events(id, 0, &events).await.unwrap();
        repo.append_events(id, 2, &[make_stored_event(id, 3)])
            .await
            .unwrap();

        let loaded = repo.load_events(id).await.unwrap();
        let sequence: Vec<i64> = loaded.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        assert_eq!(loaded[0].event_id, events[0].event_id);
    }

    #[tokio::test]
    async fn test_append_with_stale_version_is_a_conflict() {
        let repo = InMemoryEventRepository::new();
        let id = Uuid::new_v4();
        repo.append_events(id, 0, &[make_stored_event(id, 1)])
            .await
            .unwrap();

        let result = repo.append_events(id, 0, &[make_stored_event(id, 1)]).await;

        match result {
            Err(DomainError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(repo.event_count(), 1);
    }

    #[tokio::test]
    async fn test_resending_a_stored_batch_is_a_no_op() {
        let repo = InMemoryEventRepository::new();
        let id = Uuid::new_v4();
        let batch = vec![make_stored_event(id, 1)];

        repo.append_events(id, 0, &batch).await.unwrap();
        repo.append_events(id, 0, &batch).await.unwrap();

        assert_eq!(repo.load_events(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_receives_appended_events() {
        let repo = InMemoryEventRepository::new();
        let id = Uuid::new_v4();
        let mut sub = repo.subscribe(StreamFilter::Aggregate(id)).await.unwrap();

        let event = make_stored_event(id, 1);
        repo.append_events(id, 0, std::slice::from_ref(&event))
            .await
            .unwrap();

        let received = sub.next().await.unwrap();
        assert_eq!(received.event_id, event.event_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appenders_are_delivered_in_append_order() {
        let repo = Arc::new(InMemoryEventRepository::new());
        let id = Uuid::new_v4();
        let mut sub = repo.subscribe(StreamFilter::Aggregate(id)).await.unwrap();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    loop {
                        let head = i64::try_from(repo.event_count()).unwrap();
                        if head >= 200 {
                            break;
                        }
                        let _ = repo
                            .append_events(id, head, &[make_stored_event(id, head + 1)])
                            .await;
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let delivered: Vec<i64> = sub.drain().iter().map(|e| e.sequence_number).collect();
        assert_eq!(delivered, (1..=200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_rejected_append_is_not_published() {
        let repo = InMemoryEventRepository::new();
        let id = Uuid::new_v4();
        let mut sub = repo.subscribe(StreamFilter::All).await.unwrap();

        let _ = repo.append_events(id, 5, &[make_stored_event(id, 6)]).await;

        assert!(sub.try_next().is_none());
    }
}
