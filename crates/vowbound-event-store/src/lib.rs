//! Vowbound event stores.
//!
//! Both stores implement the persistence collaborator: `EventRepository`
//! (persist/fetch) and `EventStream` (subscribe).

pub mod memory_event_repository;
pub mod pg_event_repository;
