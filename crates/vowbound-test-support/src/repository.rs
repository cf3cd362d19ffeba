//! Test repositories — mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};

/// An event repository that records all `append_events` calls. Returns the
/// configured history from `load_events` for the configured aggregate (every
/// other aggregate loads empty) and always succeeds on `append_events`.
#[derive(Debug, Default)]
pub struct RecordingEventRepository {
    histories: Mutex<Vec<(Uuid, Vec<StoredEvent>)>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Create a repository with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that returns `history` for `aggregate_id`.
    #[must_use]
    pub fn with_history(aggregate_id: Uuid, history: Vec<StoredEvent>) -> Self {
        let repo = Self::new();
        repo.seed(aggregate_id, history);
        repo
    }

    /// Adds (or replaces) the history returned for `aggregate_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, aggregate_id: Uuid, history: Vec<StoredEvent>) {
        let mut histories = self.histories.lock().unwrap();
        histories.retain(|(id, _)| *id != aggregate_id);
        histories.push((aggregate_id, history));
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .histories
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == aggregate_id)
            .map(|(_, history)| history.clone())
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for "aggregate not found" scenarios and creation
/// commands.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event repository that always returns a collaborator error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Collaborator("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Collaborator("connection refused".into()))
    }
}
