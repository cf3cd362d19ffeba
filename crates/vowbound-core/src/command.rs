//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// A command targets exactly one aggregate stream; commands that touch a
/// second aggregate (a Black Flash roll restoring a character) are split into
/// one command per stream by the handler.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The aggregate stream this command is addressed to.
    fn aggregate_id(&self) -> Uuid;
}
