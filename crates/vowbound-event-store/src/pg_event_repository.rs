//! `PostgreSQL` implementation of the persistence collaborator.
//!
//! Change notifications come from the `domain_events_notify` trigger, which
//! publishes each inserted event id on [`NOTIFY_CHANNEL`]. Listeners fetch
//! the row itself, since NOTIFY payloads are size-limited.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};
use vowbound_core::stream::{EventStream, StreamFilter, Subscription};

/// Channel the insert trigger notifies on.
pub const NOTIFY_CHANNEL: &str = "vowbound_domain_events";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: row.sequence_number,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
        }
    }
}

fn collaborator(e: &sqlx::Error) -> DomainError {
    DomainError::Collaborator(e.to_string())
}

const SELECT_EVENT_COLUMNS: &str = "SELECT event_id, aggregate_id, event_type, payload, \
     sequence_number, correlation_id, causation_id, occurred_at FROM domain_events";

async fn fetch_event(pool: &PgPool, event_id: Uuid) -> Result<Option<StoredEvent>, DomainError> {
    let row: Option<EventRow> =
        sqlx::query_as(&format!("{SELECT_EVENT_COLUMNS} WHERE event_id = $1"))
            .bind(event_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| collaborator(&e))?;
    Ok(row.map(StoredEvent::from))
}

/// Resolves a change notification to its stored event.
async fn notified_event(pool: &PgPool, payload: &str) -> Result<Option<StoredEvent>, DomainError> {
    let event_id = Uuid::parse_str(payload)
        .map_err(|e| DomainError::Collaborator(format!("bad change notification: {e}")))?;
    fetch_event(pool, event_id).await
}

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Collaborator` if a migration fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Collaborator(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    #[instrument(skip(self))]
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENT_COLUMNS} WHERE aggregate_id = $1 ORDER BY sequence_number"
        ))
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| collaborator(&e))?;

        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| collaborator(&e))?;

        let actual: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| collaborator(&e))?;

        if actual != expected_version {
            let ids: Vec<Uuid> = events.iter().map(|event| event.event_id).collect();
            let stored: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM domain_events WHERE aggregate_id = $1 AND event_id = ANY($2)",
            )
            .bind(aggregate_id)
            .bind(&ids)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| collaborator(&e))?;
            if !ids.is_empty() && usize::try_from(stored).is_ok_and(|n| n == ids.len()) {
                debug!(%aggregate_id, "batch already stored, ignoring resend");
                return Ok(());
            }
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(
                "INSERT INTO domain_events (event_id, aggregate_id, event_type, payload, \
                 sequence_number, correlation_id, causation_id, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(event.event_id)
            .bind(event.aggregate_id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.sequence_number)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                let unique_violation = e
                    .as_database_error()
                    .and_then(|db| db.code())
                    .is_some_and(|code| code == UNIQUE_VIOLATION);
                return Err(if unique_violation {
                    DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: event.sequence_number,
                    }
                } else {
                    collaborator(&e)
                });
            }
        }

        tx.commit().await.map_err(|e| collaborator(&e))
    }
}

#[async_trait]
impl EventStream for PgEventRepository {
    async fn subscribe(&self, filter: StreamFilter) -> Result<Subscription, DomainError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| collaborator(&e))?;
        listener
            .listen(NOTIFY_CHANNEL)
            .await
            .map_err(|e| collaborator(&e))?;

        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let subscription = Subscription::new(Uuid::new_v4(), receiver);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = sender.closed() => break,
                    notification = listener.recv() => match notification {
                        Ok(notification) => {
                            match notified_event(&pool, notification.payload()).await {
                                Ok(Some(event)) if filter.matches(&event) => {
                                    if sender.send(event).is_err() {
                                        break;
                                    }
                                }
                                Ok(_) => {}
                                Err(e) => warn!(error = %e, "unresolvable change notification"),
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "change stream listener failed");
                            break;
                        }
                    },
                }
            }
        });

        Ok(subscription)
    }
}
