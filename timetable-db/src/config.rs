//! Pool configuration.
//!
//! Defaults mirror the production deployment: a large pool with
//! overflow headroom, aggressive health checking, and server-side
//! statement / idle-in-transaction timeouts so a stalled query is
//! killed by the engine rather than hanging a caller forever.

use serde::Deserialize;

/// Connection pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Steady-state pool size
    pub pool_size: u32,
    /// Extra connections allowed beyond `pool_size` under load
    pub max_overflow: u32,
    /// How long a checkout may wait for a free connection
    pub acquire_timeout_secs: u64,
    /// Connection max age before forced recycle
    pub max_lifetime_secs: u64,
    /// Health-probe connections before handing them out
    pub test_before_acquire: bool,
    /// Server-side per-statement timeout
    pub statement_timeout_ms: u64,
    /// Server-side idle-in-transaction timeout
    pub idle_tx_timeout_ms: u64,
    /// Client identification tag reported to the server
    pub application_name: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/timetable".to_string()),
            pool_size: 50,
            max_overflow: 25,
            acquire_timeout_secs: 30,
            max_lifetime_secs: 300,
            test_before_acquire: true,
            statement_timeout_ms: 60_000,
            idle_tx_timeout_ms: 300_000,
            application_name: "timetable".to_string(),
        }
    }
}

impl DbConfig {
    /// Build from the process environment. `DATABASE_URL` is required
    /// in practice; sizing knobs are optional overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("TIMETABLE_POOL_SIZE") {
            config.pool_size = v;
        }
        if let Some(v) = env_parse("TIMETABLE_MAX_OVERFLOW") {
            config.max_overflow = v;
        }
        if let Ok(v) = std::env::var("TIMETABLE_APPLICATION_NAME") {
            config.application_name = v;
        }
        config
    }

    /// Hard ceiling the pool will ever open.
    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

fn env_parse(key: &str) -> Option<u32> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, raw = %raw, "ignoring unparseable pool setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let config = DbConfig::default();
        assert_eq!(config.pool_size, 50);
        assert_eq!(config.max_overflow, 25);
        assert_eq!(config.max_connections(), 75);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.max_lifetime_secs, 300);
        assert!(config.test_before_acquire);
        assert_eq!(config.statement_timeout_ms, 60_000);
        assert_eq!(config.idle_tx_timeout_ms, 300_000);
    }

    // single test so the env mutations cannot race each other
    #[test]
    fn env_overrides_apply_and_bad_values_are_skipped() {
        std::env::set_var("TIMETABLE_POOL_SIZE", "7");
        std::env::set_var("TIMETABLE_MAX_OVERFLOW", "lots");
        std::env::set_var("TIMETABLE_APPLICATION_NAME", "timetable-test");
        let config = DbConfig::from_env();
        std::env::remove_var("TIMETABLE_POOL_SIZE");
        std::env::remove_var("TIMETABLE_MAX_OVERFLOW");
        std::env::remove_var("TIMETABLE_APPLICATION_NAME");

        assert_eq!(config.pool_size, 7);
        // unparseable override falls back to the default
        assert_eq!(config.max_overflow, 25);
        assert_eq!(config.application_name, "timetable-test");
        assert_eq!(config.max_connections(), 32);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: DbConfig =
            serde_json::from_str(r#"{"pool_size": 4, "application_name": "test"}"#).unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.application_name, "test");
        // untouched knobs keep their defaults
        assert_eq!(config.max_overflow, 25);
    }
}
