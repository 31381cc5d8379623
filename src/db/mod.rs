use sqlx::PgPool;

use crate::models::StockStatus;
use crate::Result;

// Re-export submodules
mod products;
mod schema;

pub use products::InsertProduct;

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    in_stock_table: String,
    out_of_stock_table: String,
}

impl Database {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            in_stock_table: "in_stock_products".to_string(),
            out_of_stock_table: "out_of_stock_products".to_string(),
        }
    }

    /// Create a new database instance from configuration
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections())
            .min_connections(config.min_connections())
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout()));

        let pool = pool_options.connect(config.database_url()).await?;

        tracing::info!(
            "Database pool configured: max_connections={}, min_connections={}",
            config.max_connections(),
            config.min_connections()
        );

        Ok(Self {
            pool,
            in_stock_table: config.in_stock_table().to_string(),
            out_of_stock_table: config.out_of_stock_table().to_string(),
        })
    }

    /// Partition table name for a stock status
    #[must_use]
    pub fn table_for(&self, partition: StockStatus) -> &str {
        match partition {
            StockStatus::InStock => &self.in_stock_table,
            StockStatus::OutOfStock => &self.out_of_stock_table,
        }
    }

    /// Get a reference to the database pool for raw queries
    #[must_use]
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
