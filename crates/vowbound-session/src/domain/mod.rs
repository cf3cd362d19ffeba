//! Domain layer for the Game Sessions context.

pub mod aggregates;
pub mod combat;
pub mod commands;
pub mod events;
