// Persistence layer for the campus registry.
// Store traits per aggregate with a Postgres implementation and an
// in-memory one that keeps the same uniqueness and deletion rules.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod utils;

// Re-export commonly used items
pub use sqlx;
pub use uuid;
pub use chrono;
pub use config::DatabaseConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repositories::Stores;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database instance from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    /// Postgres-backed stores sharing this pool.
    pub fn stores(&self) -> Stores {
        Stores::postgres(self.pool.clone())
    }
}
