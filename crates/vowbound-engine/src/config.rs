//! Engine configuration read from the environment.

use std::str::FromStr;

use crate::error::EngineError;

pub const DATABASE_URL_VAR: &str = "VOWBOUND_DATABASE_URL";
pub const DB_MAX_CONNECTIONS_VAR: &str = "VOWBOUND_DB_MAX_CONNECTIONS";
pub const LOG_FORMAT_VAR: &str = "VOWBOUND_LOG_FORMAT";
pub const RECENT_ROLLS_VAR: &str = "VOWBOUND_RECENT_ROLLS";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(EngineError::Config(format!(
                "{LOG_FORMAT_VAR} must be `json` or `pretty`, got `{other}`"
            ))),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_format: LogFormat,
    /// How many rolls the recent-rolls view shows.
    pub recent_rolls: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            log_format: LogFormat::Json,
            recent_rolls: 5,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let db_max_connections = match var(DB_MAX_CONNECTIONS_VAR) {
            Some(raw) => parse_positive(DB_MAX_CONNECTIONS_VAR, &raw)?,
            None => defaults.db_max_connections,
        };
        let recent_rolls = match var(RECENT_ROLLS_VAR) {
            Some(raw) => parse_positive(RECENT_ROLLS_VAR, &raw)?,
            None => defaults.recent_rolls,
        };
        let log_format = match var(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            database_url: var(DATABASE_URL_VAR),
            db_max_connections,
            log_format,
            recent_rolls,
        })
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, EngineError>
where
    T: FromStr + PartialEq + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value != T::default())
        .ok_or_else(|| {
            EngineError::Config(format!("{key} must be a positive integer, got `{raw}`"))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.recent_rolls, 5);
        assert_eq!(config.db_max_connections, 10);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (DATABASE_URL_VAR, "postgres://localhost/vowbound"),
            (DB_MAX_CONNECTIONS_VAR, "4"),
            (LOG_FORMAT_VAR, "Pretty"),
            (RECENT_ROLLS_VAR, "12"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/vowbound")
        );
        assert_eq!(config.db_max_connections, 4);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.recent_rolls, 12);
    }

    #[test]
    fn test_blank_database_url_selects_memory_store() {
        let config = EngineConfig::from_lookup(lookup(&[(DATABASE_URL_VAR, "  ")])).unwrap();

        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let result = EngineConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")]));

        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_and_non_numeric_counts() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(RECENT_ROLLS_VAR, "0")])),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(DB_MAX_CONNECTIONS_VAR, "many")])),
            Err(EngineError::Config(_))
        ));
    }
}
