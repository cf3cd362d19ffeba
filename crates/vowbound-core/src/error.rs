//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict reported by the store.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// Caller-supplied input violates a stated constraint.
    #[error("validation error: {0}")]
    Validation(String),

    /// Combat was started with nobody to fight.
    #[error("validation error: combat roster is empty")]
    EmptyRoster,

    /// A turn operation was invoked while no combat is running.
    #[error("combat is not active")]
    CombatNotActive,

    /// Required context (session, acting actor, owning character) is absent
    /// or the aggregate is in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The acting user may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The persistence/realtime collaborator failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl DomainError {
    /// Returns `true` for errors raised by caller input rather than by
    /// missing context or infrastructure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EmptyRoster)
    }
}
