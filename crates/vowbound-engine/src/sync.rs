//! Outbound sync: the fire-and-forget half of the optimistic update.
//!
//! The controller applies events locally, then hands the batch to a single
//! background task that appends batches in submission order. Failures are
//! logged and dropped: nothing is retried and local state is not rolled back.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;
use vowbound_core::repository::StoredEvent;

use crate::store::EventStore;

/// Events committed locally for one aggregate, waiting to be appended.
#[derive(Debug, Clone)]
pub struct SyncBatch {
    pub aggregate_id: Uuid,
    /// Stream head the batch was produced against.
    pub expected_version: i64,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug)]
enum SyncJob {
    Append(SyncBatch),
    Flush(oneshot::Sender<()>),
}

/// Handle on the background sync task.
#[derive(Debug)]
pub struct SyncWorker {
    sender: mpsc::UnboundedSender<SyncJob>,
    task: JoinHandle<()>,
}

impl SyncWorker {
    /// Spawns the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn EventStore>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SyncJob>();
        let task = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match job {
                    SyncJob::Append(batch) => append(store.as_ref(), &batch).await,
                    SyncJob::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        Self { sender, task }
    }

    /// Queues `batch` for appending. Returns immediately.
    pub fn enqueue(&self, batch: SyncBatch) {
        if batch.events.is_empty() {
            return;
        }
        if self.sender.send(SyncJob::Append(batch)).is_err() {
            warn!("sync worker has stopped; dropping batch");
        }
    }

    /// Waits until every batch queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(SyncJob::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Drains the queue and stops the worker.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.task.await {
            warn!(error = %e, "sync worker terminated abnormally");
        }
    }
}

async fn append(store: &dyn EventStore, batch: &SyncBatch) {
    match store
        .append_events(batch.aggregate_id, batch.expected_version, &batch.events)
        .await
    {
        Ok(()) => debug!(
            aggregate_id = %batch.aggregate_id,
            events = batch.events.len(),
            "batch synced"
        ),
        Err(e) => warn!(
            aggregate_id = %batch.aggregate_id,
            expected_version = batch.expected_version,
            error = %e,
            "sync failed; local state kept"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use vowbound_core::repository::EventRepository;
    use vowbound_event_store::memory_event_repository::InMemoryEventRepository;

    use super::*;

    fn event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            event_type: "session.turn_advanced".to_owned(),
            payload: serde_json::json!({}),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_batches_are_appended_in_submission_order() {
        let store = Arc::new(InMemoryEventRepository::new());
        let worker = SyncWorker::spawn(store.clone());
        let id = Uuid::new_v4();

        worker.enqueue(SyncBatch {
            aggregate_id: id,
            expected_version: 0,
            events: vec![event(id, 1)],
        });
        worker.enqueue(SyncBatch {
            aggregate_id: id,
            expected_version: 1,
            events: vec![event(id, 2), event(id, 3)],
        });
        worker.flush().await;

        let stored = store.load_events(id).await.unwrap();
        let sequence: Vec<i64> = stored.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_worker() {
        let store = Arc::new(InMemoryEventRepository::new());
        let worker = SyncWorker::spawn(store.clone());
        let (stale, fresh) = (Uuid::new_v4(), Uuid::new_v4());

        worker.enqueue(SyncBatch {
            aggregate_id: stale,
            expected_version: 7,
            events: vec![event(stale, 8)],
        });
        worker.enqueue(SyncBatch {
            aggregate_id: fresh,
            expected_version: 0,
            events: vec![event(fresh, 1)],
        });
        worker.shutdown().await;

        assert!(store.load_events(stale).await.unwrap().is_empty());
        assert_eq!(store.load_events(fresh).await.unwrap().len(), 1);
    }
}
