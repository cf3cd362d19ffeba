//! Application layer for the Game Sessions context.

pub mod command_handlers;
pub mod query_handlers;
