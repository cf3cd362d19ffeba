//! Vowbound engine — startup error types.

use thiserror::Error;
use vowbound_core::error::DomainError;

/// Startup and wiring errors for the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A configuration variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The tracing subscriber could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// A domain operation failed during startup, e.g. running migrations.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_the_problem() {
        let err = EngineError::Config("VOWBOUND_RECENT_ROLLS must be a positive integer".into());

        assert_eq!(
            err.to_string(),
            "configuration error: VOWBOUND_RECENT_ROLLS must be a positive integer"
        );
    }

    #[test]
    fn test_domain_error_is_passed_through() {
        let err = EngineError::from(DomainError::Collaborator("migration failed".into()));

        assert_eq!(err.to_string(), "collaborator error: migration failed");
    }
}
