//! Product rows: k-NN retrieval and batch insertion

use pgvector::Vector;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::debug;
use tracing::info;

use super::Database;
use crate::models::sanitize_f32;
use crate::models::sanitize_f64;
use crate::models::ProductRecord;
use crate::models::SearchCandidate;
use crate::models::StockStatus;
use crate::Result;
use crate::StyleRankError;

/// Raw row shape returned by the similarity query
#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    title: String,
    average_rating: Option<f32>,
    rating_number: Option<i32>,
    features: Option<serde_json::Value>,
    description: Option<String>,
    price: Option<f64>,
    images: Option<serde_json::Value>,
    store: Option<String>,
    categories: Option<String>,
    details: Option<serde_json::Value>,
    similarity: Option<f64>,
}

impl ProductRow {
    fn into_candidate(self, partition: StockStatus) -> SearchCandidate {
        SearchCandidate {
            product: ProductRecord {
                id: self.id,
                title: self.title,
                // Corrupted embeddings or NUMERIC 'NaN' must not leak into
                // the response as non-finite floats
                average_rating: sanitize_f32(self.average_rating),
                rating_number: self.rating_number,
                features: self.features,
                description: self.description,
                price: sanitize_f64(self.price),
                images: self.images,
                store: self.store,
                categories: self.categories,
                details: self.details.unwrap_or(serde_json::Value::Null),
            },
            similarity: sanitize_f64(self.similarity),
            stock_status: partition,
        }
    }
}

/// One catalog row ready for insertion, price parsed at ingest time
#[derive(Debug, Clone)]
pub struct InsertProduct {
    pub title: String,
    pub average_rating: Option<f32>,
    pub rating_number: Option<i32>,
    pub features: Option<serde_json::Value>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub images: Option<serde_json::Value>,
    pub store: Option<String>,
    pub categories: Option<String>,
    pub details: Option<serde_json::Value>,
    pub embedding: Vec<f32>,
}

impl Database {
    /// k-nearest-neighbor search over one partition, strictly descending by
    /// cosine similarity. Returns at most `top_k` candidates; `top_k` is
    /// clamped to `[1, max_top_k]` for library callers.
    pub async fn search_products(
        &self,
        query_embedding: &[f32],
        partition: StockStatus,
        top_k: i64,
        max_top_k: i64,
    ) -> Result<Vec<SearchCandidate>> {
        let limit = top_k.clamp(1, max_top_k);
        let table = self.table_for(partition);

        let sql = format!(
            r"
            SELECT
                id,
                title,
                average_rating,
                rating_number,
                features,
                description,
                price::float8 AS price,
                images,
                store,
                categories,
                details,
                1 - (embedding <=> $1) AS similarity
            FROM {table}
            ORDER BY embedding <=> $1
            LIMIT $2
            "
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(Vector::from(query_embedding.to_vec()))
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_partition_error(e, table))?;

        debug!("{} products found from {}", rows.len(), table);

        Ok(rows
            .into_iter()
            .map(|row| row.into_candidate(partition))
            .collect())
    }

    /// Insert catalog rows into one partition in batches, skipping rows whose
    /// dedup hash already exists.
    pub async fn batch_insert_products(
        &self,
        products: &[InsertProduct],
        partition: StockStatus,
        batch_size: usize,
    ) -> Result<u64> {
        if products.is_empty() {
            tracing::warn!("No products to insert into {}", self.table_for(partition));
            return Ok(0);
        }

        let table = self.table_for(partition);
        let sql = format!(
            r"
            INSERT INTO {table}
                (title, average_rating, rating_number, features,
                 description, price, images, store, categories,
                 details, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (unique_hash) DO NOTHING
            "
        );

        let mut inserted = 0u64;
        for chunk in products.chunks(batch_size.max(1)) {
            let mut tx = self.pool().begin().await?;
            for product in chunk {
                let result = sqlx::query(&sql)
                    .bind(&product.title)
                    .bind(product.average_rating)
                    .bind(product.rating_number)
                    .bind(&product.features)
                    .bind(&product.description)
                    .bind(product.price)
                    .bind(&product.images)
                    .bind(&product.store)
                    .bind(&product.categories)
                    .bind(&product.details)
                    .bind(Vector::from(product.embedding.clone()))
                    .execute(&mut *tx)
                    .await?;
                inserted += result.rows_affected();
            }
            tx.commit().await?;
            info!("Inserted batch of {} products into {}", chunk.len(), table);
        }

        info!("Inserted {} of {} products into {}", inserted, products.len(), table);
        Ok(inserted)
    }
}

/// A missing partition table is a schema mismatch, not a generic SQL error
fn map_partition_error(error: sqlx::Error, table: &str) -> StyleRankError {
    if let Some(db_err) = error.as_database_error() {
        // 42P01: undefined_table
        if db_err.code().as_deref() == Some("42P01") {
            return StyleRankError::PartitionNotFound(table.to_string());
        }
    }
    StyleRankError::Database(error)
}
