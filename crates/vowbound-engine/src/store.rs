//! Store selection.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use vowbound_core::repository::EventRepository;
use vowbound_core::stream::EventStream;
use vowbound_event_store::memory_event_repository::InMemoryEventRepository;
use vowbound_event_store::pg_event_repository::PgEventRepository;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// The full persistence collaborator: persist, fetch and subscribe.
pub trait EventStore: EventRepository + EventStream {}

impl<T: EventRepository + EventStream> EventStore for T {}

/// Opens the store named by the configuration: PostgreSQL when a database
/// URL is set (migrations are applied on connect), in-memory otherwise.
///
/// # Errors
///
/// Returns `EngineError::Database` if the pool cannot connect, or
/// `EngineError::Domain` if migrations fail.
pub async fn connect(config: &EngineConfig) -> Result<Arc<dyn EventStore>, EngineError> {
    let Some(url) = config.database_url.as_deref() else {
        info!("no database configured, using in-memory event store");
        return Ok(Arc::new(InMemoryEventRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(url)
        .await?;
    let store = PgEventRepository::new(pool);
    store.migrate().await?;
    info!(max_connections = config.db_max_connections, "connected to PostgreSQL event store");
    Ok(Arc::new(store))
}
