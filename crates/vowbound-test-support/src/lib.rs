//! Shared test mocks and utilities for the Vowbound tabletop engine.

mod clock;
mod repository;
mod rng;

pub use clock::{FixedClock, fixed_clock};
pub use repository::{EmptyEventRepository, FailingEventRepository, RecordingEventRepository};
pub use rng::{MockRng, SequenceRng};
