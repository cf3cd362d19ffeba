//! Vowbound — Game Sessions.
//!
//! The `GameSession` aggregate owns the combat initiative state machine and
//! the roll history. It references enrolled characters by id; the
//! characters themselves live in their own streams.

pub mod application;
pub mod domain;
