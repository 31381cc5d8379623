//! Partition table and vector index DDL

use tracing::info;

use super::Database;
use crate::models::StockStatus;
use crate::Result;

impl Database {
    /// Create the pgvector extension, both partition tables, and their
    /// cosine-distance indexes. Idempotent.
    pub async fn init_schema(&self, embedding_dimension: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(self.pool())
            .await?;

        for partition in [StockStatus::InStock, StockStatus::OutOfStock] {
            let table = self.table_for(partition);

            // unique_hash prevents duplicate products across ingest runs
            let ddl = format!(
                r"
                CREATE TABLE IF NOT EXISTS {table} (
                    id              BIGSERIAL PRIMARY KEY,
                    title           TEXT        NOT NULL,
                    average_rating  REAL,
                    rating_number   INTEGER,
                    features        JSONB,
                    description     TEXT,
                    price           NUMERIC,
                    images          JSONB,
                    store           TEXT,
                    categories      TEXT,
                    details         JSONB,
                    embedding       VECTOR({embedding_dimension}),
                    unique_hash     TEXT GENERATED ALWAYS AS (
                        MD5(title || COALESCE(description, '') || COALESCE(store, ''))
                    ) STORED,
                    UNIQUE (unique_hash)
                )
                "
            );
            sqlx::query(&ddl).execute(self.pool()).await?;

            let index = format!(
                r"
                CREATE INDEX IF NOT EXISTS {table}_emb_cos_idx
                ON {table} USING ivfflat (embedding vector_cosine_ops)
                "
            );
            sqlx::query(&index).execute(self.pool()).await?;

            info!("Initialized partition table {}", table);
        }

        Ok(())
    }

    /// Number of products in a partition
    pub async fn count_products(&self, partition: StockStatus) -> Result<i64> {
        let table = self.table_for(partition);
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: (i64,) = sqlx::query_as(&sql).fetch_one(self.pool()).await?;
        Ok(count.0)
    }
}
