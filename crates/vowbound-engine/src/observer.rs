//! Change notifications for UI-side observers.

use uuid::Uuid;
use vowbound_rules::domain::resolution::DiceRoll;

/// Where an applied change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by this controller.
    Local,
    /// Delivered by the change stream.
    Remote,
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Character { character_id: Uuid, origin: Origin },
    Session { session_id: Uuid, origin: Origin },
    /// A roll was appended to a session's history.
    Roll { session_id: Uuid, roll: DiceRoll, origin: Origin },
}

/// Receives change notifications. Implemented for any matching closure.
pub trait Observer: Send + Sync {
    fn notify(&self, change: &Change);
}

impl<F> Observer for F
where
    F: Fn(&Change) + Send + Sync,
{
    fn notify(&self, change: &Change) {
        self(change);
    }
}

/// Identifies a registered observer so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

/// Registered observers, notified in registration order.
#[derive(Default)]
pub struct Observers {
    entries: Vec<(ObserverId, Box<dyn Observer>)>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl Observers {
    pub fn register(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        let id = ObserverId(Uuid::new_v4());
        self.entries.push((id, observer));
        id
    }

    /// Returns `true` if `id` was registered.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn notify(&self, change: &Change) {
        for (_, observer) in &self.entries {
            observer.notify(change);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
