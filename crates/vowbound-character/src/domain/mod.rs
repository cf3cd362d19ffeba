//! Domain layer for the Characters context.

pub mod abilities;
pub mod aggregates;
pub mod commands;
pub mod events;
pub mod spells;
pub mod states;
pub mod vows;
