//! Shared helpers for engine integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};
use vowbound_core::rng::DeterministicRng;
use vowbound_core::stream::{EventStream, StreamFilter, Subscription};
use vowbound_engine::config::EngineConfig;
use vowbound_engine::controller::GameController;
use vowbound_engine::observer::Change;
use vowbound_engine::store::EventStore;
use vowbound_event_store::memory_event_repository::InMemoryEventRepository;
use vowbound_test_support::{MockRng, fixed_clock};

fn clock() -> Arc<dyn Clock> {
    Arc::new(fixed_clock())
}

/// A controller over `store` drawing dice from `rng`.
pub fn controller_with_rng(
    store: Arc<dyn EventStore>,
    rng: impl DeterministicRng + 'static,
) -> GameController {
    GameController::new(store, clock(), Box::new(rng), &EngineConfig::default())
}

/// A controller over `store` where every die lands on 1.
pub fn controller(store: Arc<dyn EventStore>) -> GameController {
    controller_with_rng(store, MockRng)
}

pub fn memory_store() -> Arc<InMemoryEventRepository> {
    Arc::new(InMemoryEventRepository::new())
}

/// Records every change an observer receives.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog(Arc<Mutex<Vec<Change>>>);

impl ChangeLog {
    pub fn observer(&self) -> impl Fn(&Change) + Send + Sync + 'static {
        let sink = Arc::clone(&self.0);
        move |change: &Change| sink.lock().unwrap().push(change.clone())
    }

    pub fn changes(&self) -> Vec<Change> {
        self.0.lock().unwrap().clone()
    }
}

/// A store whose reads succeed against an inner memory store but whose
/// appends always fail.
#[derive(Debug, Default)]
pub struct UnwritableStore {
    inner: InMemoryEventRepository,
}

#[async_trait]
impl EventRepository for UnwritableStore {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.load_events(aggregate_id).await
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

#[async_trait]
impl EventStream for UnwritableStore {
    async fn subscribe(&self, filter: StreamFilter) -> Result<Subscription, DomainError> {
        self.inner.subscribe(filter).await
    }
}
