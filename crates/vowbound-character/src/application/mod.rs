//! Application layer for the Characters context.

pub mod command_handlers;
pub mod query_handlers;
