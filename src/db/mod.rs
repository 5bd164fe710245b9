//! Database initialization, migrations, and connectivity checks.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup creates the shared SQLx pool and applies schema migrations before
//! the listener binds. The health endpoints reuse the checks below to report
//! connection latency and pool usage.

use std::time::Instant;

use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    tracing::info!(max_connections, "database: migrations applied");

    Ok(pool)
}

/// Run `SELECT 1` and return the round-trip time in milliseconds.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn ping(pool: &PgPool) -> Result<f64, sqlx::Error> {
    let started = Instant::now();
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(started.elapsed().as_secs_f64() * 1000.0)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

#[must_use]
pub fn pool_stats(pool: &PgPool) -> PoolStats {
    PoolStats { size: pool.size(), idle: pool.num_idle(), max_connections: pool.options().get_max_connections() }
}

/// Database size (pretty-printed) and active backend count.
///
/// # Errors
///
/// Returns an error if the catalog queries fail.
pub async fn server_info(pool: &PgPool) -> Result<(String, i64), sqlx::Error> {
    let size: String = sqlx::query("SELECT pg_size_pretty(pg_database_size(current_database())) AS size")
        .fetch_one(pool)
        .await?
        .get("size");
    let active: i64 = sqlx::query("SELECT count(*) AS active FROM pg_stat_activity WHERE state = 'active'")
        .fetch_one(pool)
        .await?
        .get("active");
    Ok((size, active))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
