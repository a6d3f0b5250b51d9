//! Database connection pool management.
//!
//! One `ConnectionManager` instance is constructed at process startup
//! and passed to whatever needs storage; it lazily builds a single
//! `PgPool` shared for the process lifetime. Statement and
//! idle-in-transaction timeouts are set per connection so the server
//! kills stalled work; the resulting error reaches the retry logic
//! like any other storage failure.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool};
use tokio::sync::OnceCell;

use crate::config::DbConfig;
use crate::error::{DbError, Result};

/// Owns the process-wide connection pool
pub struct ConnectionManager {
    config: DbConfig,
    pool: OnceCell<PgPool>,
}

impl ConnectionManager {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Idempotent: the first call builds the pool, later calls return
    /// the same instance. An unreachable target fails here without
    /// retry; retry is the executor's job.
    pub async fn acquire(&self) -> Result<&PgPool> {
        self.pool.get_or_try_init(|| self.build_pool()).await
    }

    async fn build_pool(&self) -> Result<PgPool> {
        let options = PgConnectOptions::from_str(&self.config.database_url)
            .map_err(|e| DbError::Config(e.to_string()))?
            .application_name(&self.config.application_name);

        let statement_timeout = self.config.statement_timeout_ms;
        let idle_tx_timeout = self.config.idle_tx_timeout_ms;

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections())
            .acquire_timeout(Duration::from_secs(self.config.acquire_timeout_secs))
            .max_lifetime(Duration::from_secs(self.config.max_lifetime_secs))
            .test_before_acquire(self.config.test_before_acquire)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(format!("SET statement_timeout = {statement_timeout}").as_str())
                        .await?;
                    conn.execute(
                        format!(
                            "SET idle_in_transaction_session_timeout = {idle_tx_timeout}"
                        )
                        .as_str(),
                    )
                    .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        tracing::info!(
            max_connections = self.config.max_connections(),
            application_name = %self.config.application_name,
            "database pool created"
        );
        Ok(pool)
    }
}
