//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// Domain methods never mutate state directly: they validate, then push an
/// uncommitted event. State only changes through [`AggregateRoot::apply`], so
/// local commands and remote change-stream events share one transition path.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent + Clone;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Applies every uncommitted event to local state and drains them,
    /// returning the drained events in order.
    ///
    /// This is the optimistic path: the caller reflects the change
    /// immediately and hands the returned events to the persistence
    /// collaborator afterwards.
    fn commit_locally(&mut self) -> Vec<Self::Event> {
        let pending = self.uncommitted_events().to_vec();
        for event in &pending {
            self.apply(event);
        }
        self.clear_uncommitted_events();
        pending
    }
}
